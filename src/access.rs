// Copyright 2020 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Filesystem permission checks used when validating configuration.

use std::fs;
use std::path::Path;

/// True if `path` names a regular file this process could execute.
#[cfg(unix)]
pub(crate) fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match fs::metadata(path) {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub(crate) fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// True if `path` can be opened for reading right now.
pub(crate) fn is_readable(path: &Path) -> bool {
    fs::File::open(path).is_ok()
}

#[cfg(test)]
mod test {
    use std::fs::File;

    use tempfile::TempDir;

    use super::*;

    #[cfg(unix)]
    #[test]
    fn plain_file_is_not_executable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data");
        File::create(&path).unwrap();
        assert!(!is_executable(&path));
    }

    #[cfg(unix)]
    #[test]
    fn file_with_exec_bit_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tool");
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(is_executable(&path));
    }

    #[test]
    fn directory_is_not_executable() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_executable(tmp.path()));
    }

    #[test]
    fn missing_file_is_neither() {
        let path = Path::new("/usr/not/exists/rsync!!");
        assert!(!is_executable(path));
        assert!(!is_readable(path));
    }

    #[test]
    fn created_file_is_readable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fake_key.pub");
        File::create(&path).unwrap();
        assert!(is_readable(&path));
    }
}
