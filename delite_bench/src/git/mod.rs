mod git_lowlevel;
mod git_types;

pub mod git_interop;
