#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Definition with a placeholder build (2.0.0.200) between two named builds.
pub const SPELL_DEFINITION: &str = "\
columns:
  ID:
    type: int
  Health:
    type: int
  Mana:
    type: int
  Title:
    type: string
  Field_2_0_0_200_001:
    type: int
  Field_2_0_0_200_002:
    type: string
versions:
- builds:
  - 1.0.0.100
  fields:
  - name: ID
    is_id: true
  - name: Health
  - name: Mana
  - name: Title
- builds:
  - 2.0.0.200
  fields:
  - name: ID
    is_id: true
  - name: Field_2_0_0_200_001
  - name: Field_2_0_0_200_002
- builds:
  - 3.0.0.300
  fields:
  - name: ID
    is_id: true
  - name: Health
  - name: Mana
  - name: Title
";

pub const OLDER_SAMPLE: &str = "\
ID,Health,Mana,Title
1,10,1,Fire
2,20,2,Frost
3,0,0,Arcane
4,0,0,Nature
5,5,9,Shadow
";

pub const TARGET_SAMPLE: &str = "\
ID,Field_2_0_0_200_001,Field_2_0_0_200_002
1,10,Fire
2,20,Frost
3,0,Arcane
4,0,Nature
5,5,Shadow
";

pub const NEWER_SAMPLE: &str = "\
ID,Health,Mana,Title
1,10,1,Fire
2,20,2,Frost
3,0,0,Arcane
4,0,0,Nature
5,5,9,Shadow
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn definitions(&self) -> PathBuf {
        self.path().join("definitions")
    }

    pub fn samples(&self) -> PathBuf {
        self.path().join("samples")
    }

    /// Lays out the Spell definition and its three samples.
    pub fn spell_fixture(&self) -> PathBuf {
        self.write("samples/spell/1.0.0.100.csv", OLDER_SAMPLE);
        self.write("samples/spell/2.0.0.200.csv", TARGET_SAMPLE);
        self.write("samples/spell/3.0.0.300.csv", NEWER_SAMPLE);
        self.write("definitions/Spell.yaml", SPELL_DEFINITION)
    }
}
