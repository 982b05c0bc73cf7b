// Output device lookup (CPAL)

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

#[derive(Clone, Debug)]
pub struct AudioDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }

    /// Every output device the host exposes
    pub fn list_output_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        let Ok(devices) = self.host.output_devices() else {
            return Vec::new();
        };

        devices
            .enumerate()
            .filter_map(|(index, device)| {
                let name = device.name().ok()?;
                Some(AudioDeviceInfo {
                    id: format!("audio_out_{}", index),
                    is_default: name == default_name,
                    name,
                })
            })
            .collect()
    }

    /// Named device, or the host default when `name` is None.
    /// An unknown name falls back to the default with a warning.
    pub fn find_output_device(&self, name: Option<&str>) -> Option<Device> {
        if let Some(wanted) = name {
            if let Some(device) = self.output_device_by_name(wanted) {
                return Some(device);
            }
            log::warn!("Output device '{}' not found, using default", wanted);
        }
        self.host.default_output_device()
    }

    fn output_device_by_name(&self, device_name: &str) -> Option<Device> {
        self.host
            .output_devices()
            .ok()?
            .find(|device| device.name().is_ok_and(|name| name == device_name))
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
