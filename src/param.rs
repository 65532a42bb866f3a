/// Maximum number of processes
pub const NPROC: usize = 64;
/// Maximum number of CPUs
pub const NCPU: usize = 8;
/// Maximum number of open files per process
pub const NOFILE: usize = 16;
/// Maximum number of open files per system
pub const NFILE: usize = 100;
/// Maximum number of active inodes
pub const NINODE: usize = 50;
/// Maximum major device number
pub const NDEV: usize = 10;
/// Device number of file system root disk
pub const ROOTDEV: usize = 1;
/// Maximum file path size
pub const MAXPATH: usize = 128;

/// Number of MLFQ priority levels. 0 is highest priority.
pub const NMLFQ: usize = 5;
/// Time-slice quantum (in timer ticks) for each priority level, indexed by
/// priority. Lower priority runs for longer between preemptions.
pub const QUANTUM: [u32; NMLFQ] = [1, 2, 4, 8, 16];
/// How many ticks a process may wait at a queue entry before `age_boost`
/// promotes it one level.
pub const AGE_THRESHOLD: u32 = 200;
/// How often the timer interrupt handler runs `age_boost`.
pub const AGE_BOOST_PERIOD: u32 = 100;
