//! Console output. No read side: the scheduler has no terminal driver
//! to demonstrate, so the only consumer of this module is the
//! `print!`/`println!`/`uprintln!` logging stack in `printf`.

pub mod printf;

pub use printf::{print, println, uprint, uprintln};

pub unsafe fn consoleinit() {
    crate::hardware::UART0.initialize();
}
