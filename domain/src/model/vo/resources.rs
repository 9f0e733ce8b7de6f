use std::num::NonZeroU32;

use bytesize::ByteSize;
use serde::Deserialize;

use super::{DescriptorError, WallTime};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// What the job asks the scheduler for.
///
/// `ntasks <= nodes * tasks-per-node` is left for the scheduler to enforce,
/// it depends on hardware this side does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceRequest {
    pub nodes: NonZeroU32,
    pub ntasks: NonZeroU32,
    #[serde(default = "ResourceRequest::default_cpus_per_task")]
    pub cpus_per_task: NonZeroU32,
    pub mem_per_cpu: ByteSize,
    pub time: WallTime,
}

impl ResourceRequest {
    pub fn new(
        nodes: u32,
        ntasks: u32,
        cpus_per_task: u32,
        mem_per_cpu: ByteSize,
        time: WallTime,
    ) -> Result<Self, DescriptorError> {
        let non_zero = |x: u32, what: &'static str| {
            NonZeroU32::new(x).ok_or(DescriptorError::ZeroResource(what))
        };
        let request = Self {
            nodes: non_zero(nodes, "nodes")?,
            ntasks: non_zero(ntasks, "ntasks")?,
            cpus_per_task: non_zero(cpus_per_task, "cpus-per-task")?,
            mem_per_cpu,
            time,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn default_cpus_per_task() -> NonZeroU32 {
        NonZeroU32::MIN
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.mem_per_cpu.as_u64() == 0 {
            return Err(DescriptorError::ZeroMemory);
        }
        Ok(())
    }

    /// Memory per CPU in the unit syntax `--mem-per-cpu` takes: whole gibibytes
    /// as `G` when exact, otherwise mebibytes rounded up.
    pub fn mem_per_cpu_value(&self) -> String {
        let bytes = self.mem_per_cpu.as_u64();
        if bytes % GIB == 0 {
            format!("{}G", bytes / GIB)
        } else {
            format!("{}M", bytes.div_ceil(MIB))
        }
    }

    pub fn total_cpus(&self) -> u64 {
        u64::from(self.ntasks.get()) * u64::from(self.cpus_per_task.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mem: ByteSize) -> ResourceRequest {
        ResourceRequest::new(2, 40, 1, mem, "48:00:00".parse().unwrap()).unwrap()
    }

    #[test]
    fn memory_units() {
        assert_eq!(request(ByteSize::gib(2)).mem_per_cpu_value(), "2G");
        assert_eq!(request(ByteSize::mib(1800)).mem_per_cpu_value(), "1800M");
        assert_eq!(request(ByteSize::kib(1500)).mem_per_cpu_value(), "2M");
    }

    #[test]
    fn rejects_zero() {
        let time: WallTime = "01:00:00".parse().unwrap();
        assert_eq!(
            ResourceRequest::new(0, 40, 1, ByteSize::gib(1), time),
            Err(DescriptorError::ZeroResource("nodes"))
        );
        assert_eq!(
            ResourceRequest::new(2, 40, 0, ByteSize::gib(1), time),
            Err(DescriptorError::ZeroResource("cpus-per-task"))
        );
        assert_eq!(
            ResourceRequest::new(2, 40, 1, ByteSize::b(0), time),
            Err(DescriptorError::ZeroMemory)
        );
    }

    #[test]
    fn total_cpus() {
        let mut req = request(ByteSize::gib(2));
        req.cpus_per_task = NonZeroU32::new(4).unwrap();
        assert_eq!(req.total_cpus(), 160);
    }
}
