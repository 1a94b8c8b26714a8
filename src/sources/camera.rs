//! Camera adapter
//!
//! The hub only probes the camera at startup: it opens the configured device
//! and logs the formats it offers. Frame capture and pixel format
//! negotiation belong to the camera driver behind [`CameraSource`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{SourceError, SourceResult};

/// What a successful camera open reports
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    pub device: PathBuf,
    /// Pixel formats offered by the device, as reported by the driver
    pub formats: Vec<String>,
}

#[async_trait]
pub trait CameraSource: Send + Sync {
    fn device(&self) -> &Path;

    async fn open(&self) -> SourceResult<CameraInfo>;
}

/// Camera exposed as a device node, e.g. `/dev/video0`
pub struct DeviceCamera {
    path: PathBuf,
}

impl DeviceCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CameraSource for DeviceCamera {
    fn device(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> SourceResult<CameraInfo> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| {
            SourceError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        if metadata.is_dir() {
            return Err(SourceError::Unavailable(format!(
                "{} is a directory, not a video device",
                self.path.display()
            )));
        }

        // Format enumeration needs a capture driver; none is linked in
        Ok(CameraInfo {
            device: self.path.clone(),
            formats: Vec::new(),
        })
    }
}

/// Open the camera once at startup
///
/// A missing camera is logged and tolerated unless `required` is set, in
/// which case the error is returned and startup should abort.
pub async fn probe_camera(
    camera: &dyn CameraSource,
    required: bool,
) -> SourceResult<Option<CameraInfo>> {
    match camera.open().await {
        Ok(info) => {
            tracing::info!(device = %info.device.display(), "Camera opened");
            for format in &info.formats {
                tracing::trace!(format = %format, "Available camera format");
            }
            Ok(Some(info))
        }
        Err(e) if required => {
            tracing::error!(device = %camera.device().display(), error = %e, "Camera not found and camera.required is set");
            Err(e)
        }
        Err(e) => {
            tracing::warn!(device = %camera.device().display(), error = %e, "Camera unavailable, continuing without it");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_device_camera_missing() {
        let camera = DeviceCamera::new("/nonexistent/video9");
        assert!(matches!(
            camera.open().await,
            Err(SourceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_device_camera_rejects_directory() {
        let dir = tempdir().unwrap();
        let camera = DeviceCamera::new(dir.path());
        assert!(camera.open().await.is_err());
    }

    #[tokio::test]
    async fn test_device_camera_opens_node() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("video0");
        std::fs::write(&node, b"").unwrap();

        let info = DeviceCamera::new(&node).open().await.unwrap();
        assert_eq!(info.device, node);
    }

    #[tokio::test]
    async fn test_probe_optional_camera() {
        let camera = DeviceCamera::new("/nonexistent/video9");
        assert_eq!(probe_camera(&camera, false).await.unwrap(), None);
        assert!(probe_camera(&camera, true).await.is_err());
    }
}
