//! Device drivers. Disk/block-device drivers (`ramdisk`, `virtio_disk`)
//! belong to the file system collaborator and aren't carried here; only
//! the UART the console logs through is.

pub mod uart;

use uart::Uart;

pub static UART0: Uart = Uart::new(0x1000_0000);
