extern crate clap;
extern crate derivative;
extern crate hashbrown;
extern crate itertools;
#[macro_use]
extern crate lazy_static;
extern crate more_asserts;
#[cfg(feature = "cli")]
extern crate pbr;
extern crate prettytable;
extern crate rand;
extern crate rand_xoshiro;
extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate thiserror;

pub mod blocking;
#[cfg(feature = "cli")]
pub mod cli;
pub mod cutpacking;
pub mod decomposition;
pub mod detector;
pub mod example_problems;
pub mod external;
pub mod hrgpartition;
pub mod incidence;
pub mod matrix;
pub mod mincut;
pub mod roc;
pub mod score;
pub mod stairheur;
pub mod translate;
pub mod util;
