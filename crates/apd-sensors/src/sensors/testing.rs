//! Fake `/proc` and `/sys` trees for sensor tests.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A temporary directory removed on drop.
pub struct FakeRoot {
    root: PathBuf,
}

impl FakeRoot {
    pub fn new() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
        let root = std::env::temp_dir().join(format!(
            "apd-sensors-test-{}-{}",
            std::process::id(),
            id
        ));
        fs::create_dir_all(&root).expect("create fake root");
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.clone()
    }

    /// Writes a file relative to the root, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, contents).expect("write fake file");
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.root.join(relative)).expect("remove fake file");
    }
}

impl Drop for FakeRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
