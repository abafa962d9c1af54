pub(crate) use std::io;

pub(crate) use libc::{c_int, mode_t, off_t, pid_t};

pub(crate) use crate::error::{Error, Result};
