extern crate clap;

use crate::clap::Parser;
use blockdec::cli::*;

pub fn main() {
    Cli::parse().run();
}
