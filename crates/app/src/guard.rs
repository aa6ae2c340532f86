use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Another instance already holds {0}")]
    AlreadyRunning(String),
    #[error("Instance lock error: {0}")]
    Io(String),
}

/// # Summary
/// 单实例守卫：持有标记文件上的排他锁，保证同一时刻只有一个采样进程。
///
/// # Invariants
/// - 加锁成功后标记文件内容为当前进程 PID。
/// - Drop 时删除标记文件并释放锁。
pub struct InstanceGuard {
    file: File,
    path: PathBuf,
}

/// 标记文件被并发替换时的最大重试次数
const MAX_ATTEMPTS: usize = 3;

impl InstanceGuard {
    /// # Summary
    /// 尝试以非阻塞方式获取实例锁。
    ///
    /// # Logic
    /// 1. 确保父目录存在，打开（或创建）标记文件。
    /// 2. 尝试获取排他锁，已被占用则返回 `AlreadyRunning`。
    /// 3. 确认锁住的仍是路径上的那个文件；若已被上一个持有者删除，则重新打开再试。
    /// 4. 清空文件并写入当前 PID。
    ///
    /// # Arguments
    /// * `path`: 标记文件路径。
    ///
    /// # Returns
    /// 成功返回守卫，进程存活期间需一直持有。
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let path = path.as_ref().to_path_buf();
        let marker_path = path.display().to_string();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GuardError::Io(e.to_string()))?;
        }

        for _ in 0..MAX_ATTEMPTS {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
                .map_err(|e| GuardError::Io(format!("{}: {}", marker_path, e)))?;

            if let Err(e) = file.try_lock_exclusive() {
                if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                    return Err(GuardError::AlreadyRunning(marker_path));
                }
                return Err(GuardError::Io(format!("{}: {}", marker_path, e)));
            }

            let current = is_current_marker(&file, &path)
                .map_err(|e| GuardError::Io(format!("{}: {}", marker_path, e)))?;
            if !current {
                warn!("Instance marker {} was replaced while locking, retrying", marker_path);
                continue;
            }

            file.set_len(0).map_err(|e| GuardError::Io(e.to_string()))?;
            write!(file, "{}", std::process::id()).map_err(|e| GuardError::Io(e.to_string()))?;
            file.flush().map_err(|e| GuardError::Io(e.to_string()))?;

            info!("Instance lock acquired at {}", marker_path);
            return Ok(Self { file, path });
        }

        Err(GuardError::AlreadyRunning(marker_path))
    }
}

/// 已打开的文件是否仍是路径当前指向的那个文件（已被删除或替换时返回 false）
#[cfg(unix)]
fn is_current_marker(file: &File, path: &Path) -> std::io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match std::fs::metadata(path) {
        Ok(on_disk) => Ok(held.dev() == on_disk.dev() && held.ino() == on_disk.ino()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
fn is_current_marker(_file: &File, path: &Path) -> std::io::Result<bool> {
    Ok(path.exists())
}

impl Drop for InstanceGuard {
    // 持锁期间删除标记，之后才解锁
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove instance marker {}: {}", self.path.display(), e);
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release instance lock: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("sampler.lock");

        let guard = InstanceGuard::acquire(&path).unwrap();
        let pid = std::fs::read_to_string(&path).unwrap();
        assert_eq!(pid, std::process::id().to_string());

        let second = InstanceGuard::acquire(&path);
        assert!(matches!(second, Err(GuardError::AlreadyRunning(_))));

        drop(guard);
        assert!(!path.exists());

        // 释放后可以重新获取
        let again = InstanceGuard::acquire(&path);
        assert!(again.is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_handle_does_not_own_new_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampler.lock");

        let first = InstanceGuard::acquire(&path).unwrap();
        // 在旧持有者释放前就已打开标记文件的进程
        let stale = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        assert!(is_current_marker(&stale, &path).unwrap());

        drop(first);

        // 旧 inode 可以被锁住，但它已不再是路径上的标记文件
        stale.try_lock_exclusive().unwrap();
        assert!(!is_current_marker(&stale, &path).unwrap());

        let next = InstanceGuard::acquire(&path).unwrap();
        assert!(!is_current_marker(&stale, &path).unwrap());
        assert!(is_current_marker(&next.file, &path).unwrap());
    }
}
