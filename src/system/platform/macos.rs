//! Mach host statistics.
//!
//! All kernel structures are declared here with their C layout and copied out
//! into owned Rust values before any guard releases the kernel memory.

use std::ffi::CStr;
use std::mem;

use crate::system::counters::{CounterError, CounterSource, RawCpuSample, RawMemorySample};

type KernReturn = libc::c_int;
type MachPort = libc::c_uint;
type Natural = libc::c_uint;
type Integer = libc::c_int;
type MsgTypeNumber = libc::c_uint;

const KERN_SUCCESS: KernReturn = 0;

const HOST_CPU_LOAD_INFO: Integer = 3;
const HOST_VM_INFO64: Integer = 4;
const PROCESSOR_CPU_LOAD_INFO: Integer = 2;

const CPU_STATE_USER: usize = 0;
const CPU_STATE_SYSTEM: usize = 1;
const CPU_STATE_IDLE: usize = 2;
const CPU_STATE_NICE: usize = 3;
const CPU_STATE_MAX: usize = 4;

#[repr(C)]
#[derive(Default)]
struct HostCpuLoadInfo {
    cpu_ticks: [Natural; CPU_STATE_MAX],
}

#[repr(C, align(8))]
#[derive(Default)]
#[allow(dead_code)] // Layout mirrors vm_statistics64; only a few counters are read.
struct VmStatistics64 {
    free_count: Natural,
    active_count: Natural,
    inactive_count: Natural,
    wire_count: Natural,
    zero_fill_count: u64,
    reactivations: u64,
    pageins: u64,
    pageouts: u64,
    faults: u64,
    cow_faults: u64,
    lookups: u64,
    hits: u64,
    purges: u64,
    purgeable_count: Natural,
    speculative_count: Natural,
    decompressions: u64,
    compressions: u64,
    swapins: u64,
    swapouts: u64,
    compressor_page_count: Natural,
    throttled_count: Natural,
    external_page_count: Natural,
    internal_page_count: Natural,
    total_uncompressed_pages_in_compressor: u64,
}

unsafe extern "C" {
    static mach_task_self_: MachPort;

    fn mach_host_self() -> MachPort;
    fn mach_port_deallocate(task: MachPort, name: MachPort) -> KernReturn;
    fn host_statistics(
        host: MachPort,
        flavor: Integer,
        info: *mut Integer,
        count: *mut MsgTypeNumber,
    ) -> KernReturn;
    fn host_statistics64(
        host: MachPort,
        flavor: Integer,
        info: *mut Integer,
        count: *mut MsgTypeNumber,
    ) -> KernReturn;
    fn host_processor_info(
        host: MachPort,
        flavor: Integer,
        processor_count: *mut Natural,
        info: *mut *mut Integer,
        info_count: *mut MsgTypeNumber,
    ) -> KernReturn;
    fn vm_deallocate(task: MachPort, address: libc::uintptr_t, size: libc::uintptr_t) -> KernReturn;
}

fn task_self() -> MachPort {
    // SAFETY: read-only static initialised by the Mach runtime before main.
    unsafe { mach_task_self_ }
}

/// Send right to the host port, released on drop.
struct HostPort(MachPort);

impl HostPort {
    fn acquire() -> Self {
        // SAFETY: no preconditions; returns a send right owned by this task.
        HostPort(unsafe { mach_host_self() })
    }
}

impl Drop for HostPort {
    fn drop(&mut self) {
        // SAFETY: the right was obtained from mach_host_self and is dropped once.
        unsafe {
            mach_port_deallocate(task_self(), self.0);
        }
    }
}

/// Kernel-allocated processor info array, handed back with `vm_deallocate`.
struct ProcessorInfoBuffer {
    ptr: *mut Integer,
    len: usize,
}

impl ProcessorInfoBuffer {
    fn as_slice(&self) -> &[Integer] {
        if self.ptr.is_null() {
            return &[];
        }
        // SAFETY: the kernel returned `len` contiguous integers at `ptr`, and
        // the memory stays mapped until this guard is dropped.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl Drop for ProcessorInfoBuffer {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let size = self.len * mem::size_of::<Integer>();
        // SAFETY: the region was allocated in our task by host_processor_info.
        let kr = unsafe { vm_deallocate(task_self(), self.ptr as libc::uintptr_t, size) };
        if kr != KERN_SUCCESS {
            tracing::warn!(code = kr, "vm_deallocate of processor info failed");
        }
    }
}

fn kernel_error(call: &'static str, code: KernReturn) -> CounterError {
    CounterError::Kernel { call, code }
}

fn info_count<T>() -> MsgTypeNumber {
    (mem::size_of::<T>() / mem::size_of::<Integer>()) as MsgTypeNumber
}

fn sysctl_value<T: Default + Copy>(name: &CStr) -> Result<T, CounterError> {
    let mut value = T::default();
    let mut size = mem::size_of::<T>();
    // SAFETY: `value` is a plain integer of exactly `size` bytes.
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            (&mut value as *mut T).cast(),
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 || size != mem::size_of::<T>() {
        return Err(kernel_error("sysctlbyname", rc));
    }
    Ok(value)
}

fn page_size() -> Result<u64, CounterError> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        return Err(kernel_error("sysconf", size as i32));
    }
    Ok(size as u64)
}

fn ticks_at(info: &[Integer], core: usize) -> RawCpuSample {
    let base = core * CPU_STATE_MAX;
    // Tick counters are natural_t; reinterpret the integer_t slots as unsigned.
    let tick = |state: usize| info[base + state] as u32 as u64;
    RawCpuSample::new(
        tick(CPU_STATE_USER),
        tick(CPU_STATE_SYSTEM),
        tick(CPU_STATE_IDLE),
        tick(CPU_STATE_NICE),
    )
}

pub struct HostCounters;

impl HostCounters {
    pub fn new() -> Self {
        HostCounters
    }
}

impl Default for HostCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for HostCounters {
    fn read_system_cpu_ticks(&self) -> Result<RawCpuSample, CounterError> {
        let host = HostPort::acquire();
        let mut info = HostCpuLoadInfo::default();
        let mut count = info_count::<HostCpuLoadInfo>();
        // SAFETY: `info` is large enough for `count` integers.
        let kr = unsafe {
            host_statistics(
                host.0,
                HOST_CPU_LOAD_INFO,
                (&mut info as *mut HostCpuLoadInfo).cast(),
                &mut count,
            )
        };
        if kr != KERN_SUCCESS {
            return Err(kernel_error("host_statistics", kr));
        }
        let ticks = info.cpu_ticks;
        Ok(RawCpuSample::new(
            ticks[CPU_STATE_USER] as u64,
            ticks[CPU_STATE_SYSTEM] as u64,
            ticks[CPU_STATE_IDLE] as u64,
            ticks[CPU_STATE_NICE] as u64,
        ))
    }

    fn read_per_core_cpu_ticks(&self) -> Result<Vec<RawCpuSample>, CounterError> {
        let host = HostPort::acquire();
        let mut cpu_count: Natural = 0;
        let mut info_ptr: *mut Integer = std::ptr::null_mut();
        let mut info_len: MsgTypeNumber = 0;
        // SAFETY: all out-pointers reference live locals.
        let kr = unsafe {
            host_processor_info(
                host.0,
                PROCESSOR_CPU_LOAD_INFO,
                &mut cpu_count,
                &mut info_ptr,
                &mut info_len,
            )
        };
        let buffer = ProcessorInfoBuffer {
            ptr: info_ptr,
            len: info_len as usize,
        };
        if kr != KERN_SUCCESS {
            return Err(kernel_error("host_processor_info", kr));
        }

        let info = buffer.as_slice();
        let cores = cpu_count as usize;
        if info.len() < cores * CPU_STATE_MAX {
            return Err(CounterError::Parse {
                path: "host_processor_info",
                detail: format!("{} slots for {cores} processors", info.len()),
            });
        }
        Ok((0..cores).map(|core| ticks_at(info, core)).collect())
    }

    fn read_memory_page_counts(&self) -> Result<RawMemorySample, CounterError> {
        let host = HostPort::acquire();
        let mut stats = VmStatistics64::default();
        let mut count = info_count::<VmStatistics64>();
        // SAFETY: `stats` is large enough for `count` integers.
        let kr = unsafe {
            host_statistics64(
                host.0,
                HOST_VM_INFO64,
                (&mut stats as *mut VmStatistics64).cast(),
                &mut count,
            )
        };
        if kr != KERN_SUCCESS {
            return Err(kernel_error("host_statistics64", kr));
        }
        Ok(RawMemorySample {
            active: stats.active_count as u64,
            wired: stats.wire_count as u64,
            speculative: stats.speculative_count as u64,
            inactive: stats.inactive_count as u64,
            compressed: stats.compressor_page_count as u64,
            purgeable: stats.purgeable_count as u64,
            external: stats.external_page_count as u64,
            page_size: page_size()?,
        })
    }

    fn read_total_physical_memory(&self) -> Result<u64, CounterError> {
        sysctl_value::<u64>(c"hw.memsize")
    }

    fn logical_core_count(&self) -> Result<usize, CounterError> {
        let count = sysctl_value::<libc::c_int>(c"hw.logicalcpu")?;
        Ok(count.max(0) as usize)
    }
}
