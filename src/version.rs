use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId {
    pub epoch: u16,
    pub major: u16,
    pub minor: u16,
    pub patch: u32,
}

impl VersionId {
    pub const MIN: VersionId = VersionId::new(0, 0, 0, 0);
    pub const MAX: VersionId = VersionId::new(u16::MAX, u16::MAX, u16::MAX, u32::MAX);

    pub const fn new(epoch: u16, major: u16, minor: u16, patch: u32) -> Self {
        Self {
            epoch,
            major,
            minor,
            patch,
        }
    }

    /// Underscore separated form used inside placeholder field names,
    /// e.g. `9_0_1_33978`.
    pub fn underscored(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.epoch, self.major, self.minor, self.patch
        )
    }

    pub fn from_underscored(value: &str) -> Result<Self, AnalysisError> {
        value.replace('_', ".").parse()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.epoch, self.major, self.minor, self.patch
        )
    }
}

impl FromStr for VersionId {
    type Err = AnalysisError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || AnalysisError::MalformedRevision(value.to_string());
        let parts = value.trim().split('.').collect::<Vec<_>>();
        if parts.len() != 4 {
            return Err(malformed());
        }
        let epoch = parts[0].parse::<u16>().map_err(|_| malformed())?;
        let major = parts[1].parse::<u16>().map_err(|_| malformed())?;
        let minor = parts[2].parse::<u16>().map_err(|_| malformed())?;
        let patch = parts[3].parse::<u32>().map_err(|_| malformed())?;
        Ok(VersionId::new(epoch, major, minor, patch))
    }
}

impl Serialize for VersionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(de::Error::custom)
    }
}

/// Inclusive range of builds a schema revision is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildRange {
    pub min: VersionId,
    pub max: VersionId,
}

impl BuildRange {
    pub fn new(min: VersionId, max: VersionId) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, build: &VersionId) -> bool {
        self.min <= *build && *build <= self.max
    }
}

impl fmt::Display for BuildRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for BuildRange {
    type Err = AnalysisError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (min, max) = value
            .split_once('-')
            .ok_or_else(|| AnalysisError::MalformedRevision(value.to_string()))?;
        Ok(BuildRange::new(min.parse()?, max.parse()?))
    }
}

impl Serialize for BuildRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BuildRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(de::Error::custom)
    }
}

/// Orders `a` and `b` by their distance to `target`, closest first.
pub fn closest_ordering(target: &VersionId, a: &VersionId, b: &VersionId) -> Ordering {
    a.epoch
        .abs_diff(target.epoch)
        .cmp(&b.epoch.abs_diff(target.epoch))
        .then_with(|| {
            a.major
                .abs_diff(target.major)
                .cmp(&b.major.abs_diff(target.major))
        })
        .then_with(|| {
            a.minor
                .abs_diff(target.minor)
                .cmp(&b.minor.abs_diff(target.minor))
        })
        .then_with(|| {
            a.patch
                .abs_diff(target.patch)
                .cmp(&b.patch.abs_diff(target.patch))
        })
}

#[derive(Debug, Clone, Copy)]
pub struct ClosestSorter {
    target: VersionId,
}

impl ClosestSorter {
    pub fn new(target: VersionId) -> Self {
        Self { target }
    }

    pub fn target(&self) -> VersionId {
        self.target
    }

    pub fn compare(&self, a: &VersionId, b: &VersionId) -> Ordering {
        closest_ordering(&self.target, a, b)
    }

    pub fn sort(&self, builds: &mut [VersionId]) {
        builds.sort_by(|a, b| self.compare(a, b));
    }
}

pub fn closest<'a, I>(target: &VersionId, builds: I) -> Option<VersionId>
where
    I: IntoIterator<Item = &'a VersionId>,
{
    builds
        .into_iter()
        .copied()
        .min_by(|a, b| closest_ordering(target, a, b))
}
