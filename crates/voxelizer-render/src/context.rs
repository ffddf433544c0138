//! GPU context acquisition.

use crate::error::{RenderError, RenderResult};

/// The wgpu device and queue shared by all voxelization instances.
///
/// The context is headless: the voxelization pipeline only needs compute
/// and offscreen raster work, so no surface is created here. Callers that
/// present to a window can construct their own device and wrap it with
/// [`GpuContext::from_device`].
pub struct GpuContext {
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Creates a headless GPU context.
    ///
    /// Requests `CLEAR_TEXTURE` so continuous-mode cycles can reset the
    /// occupancy image without an extra compute pass.
    ///
    /// # Errors
    /// Returns [`RenderError::AdapterCreationFailed`] when no suitable
    /// adapter exists, or [`RenderError::DeviceCreationFailed`] when the
    /// device request fails.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        log::info!("voxelizer adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("voxelizer device"),
                required_features: wgpu::Features::CLEAR_TEXTURE,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await?;

        Ok(Self { device, queue })
    }

    /// Wraps an externally created device and queue.
    ///
    /// The device must have been created with
    /// `wgpu::Features::CLEAR_TEXTURE`.
    #[must_use]
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Returns the device limits relevant to grid allocation.
    #[must_use]
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }
}
