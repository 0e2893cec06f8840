use std::fmt;

/// Where whisper runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu { index: u32 },
}

/// Device family, the key of [`PRECISION_POLICY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Cpu,
    Gpu,
}

/// Numeric precision of the attention kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Float16,
    Float32,
}

/// Precision used on each device family. New device kinds get a row here.
pub const PRECISION_POLICY: [(DeviceKind, Precision); 2] = [
    (DeviceKind::Gpu, Precision::Float16),
    (DeviceKind::Cpu, Precision::Float32),
];

/// Whether this build links a GPU backend.
pub fn gpu_available() -> bool {
    cfg!(any(feature = "cuda", feature = "vulkan", feature = "metal"))
}

impl Device {
    /// Pick the device for a run: the GPU when asked for and compiled in, else the CPU.
    pub fn select(prefer_gpu: bool, gpu_index: u32) -> Self {
        Self::select_from(prefer_gpu && gpu_available(), gpu_index)
    }

    fn select_from(gpu: bool, gpu_index: u32) -> Self {
        if gpu {
            Device::Gpu { index: gpu_index }
        } else {
            Device::Cpu
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Cpu => DeviceKind::Cpu,
            Device::Gpu { .. } => DeviceKind::Gpu,
        }
    }

    pub fn precision(&self) -> Precision {
        let kind = self.kind();
        PRECISION_POLICY
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| *p)
            .unwrap_or(Precision::Float32)
    }

    pub fn use_gpu(&self) -> bool {
        self.kind() == DeviceKind::Gpu
    }

    pub fn gpu_index(&self) -> i32 {
        match self {
            Device::Cpu => 0,
            Device::Gpu { index } => *index as i32,
        }
    }

    /// Half-precision attention runs through whisper.cpp's flash attention path.
    pub fn flash_attn(&self) -> bool {
        self.precision() == Precision::Float16
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu { index } => write!(f, "gpu:{index}"),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Float16 => write!(f, "float16"),
            Precision::Float32 => write!(f, "float32"),
        }
    }
}
