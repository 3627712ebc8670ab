use crate::error::Result;
use crate::lv;
use ash::vk;
use std::sync::Arc;

pub struct Surface {
    pub loader: ash::extensions::khr::Surface,
    pub handle: vk::SurfaceKHR,

    // Reference-counting
    _instance: Arc<lv::Instance>,
}

impl Surface {
    pub fn new(
        instance: Arc<lv::Instance>,
        display_handle: raw_window_handle::RawDisplayHandle,
        window_handle: raw_window_handle::RawWindowHandle,
    ) -> Result<Arc<Surface>> {
        let loader = ash::extensions::khr::Surface::new(&instance.entry, &instance.instance);
        let handle = unsafe {
            ash_window::create_surface(
                &instance.entry,
                &instance.instance,
                display_handle,
                window_handle,
                None,
            )?
        };
        Ok(Arc::new(Surface {
            loader,
            handle,
            _instance: instance,
        }))
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
    }
}
