//! # uao_analysis
//!
//! uao_analysis reconstructs what the adaptive optics (AO) system of a telescope did over one
//! night, written in Rust. It reads the component logs of one telescope side for one UTC day,
//! rebuilds the sequence of commands the AO arbitrator executed, recognizes the higher level
//! operations (acquisitions, offsets, complete observations) and derives timing metrics from
//! them.
//!
//! ## Installation
//!
//! The only method of install is from source. If you have not used Rust before, you will most
//! likely need to install the Rust tool chain. See the
//! [Rust docs](https://www.rust-lang.org/tools/install) for installation instructions.
//!
//! To build and install the CLI use `cargo install --path ./uao_analysis_cli` from the top
//! level repository. The binary is called `uao_analysis`.
//!
//! ## Input
//!
//! Logs are expected in a directory tree of the form
//!
//! ```text
//! <log_path>/YYYY/MM/DD/<component>.<side>.<YYYYMMDD><HHMM>.log[.gz]
//! ```
//!
//! One file per component per hour. Plain and gzip compressed files can be mixed. Each line
//! is a `|` separated record whose fourth field is a `YYYY-MM-DD HH:MM:SS.ffffff` UTC
//! timestamp and whose fifth field is the message. The components read are:
//!
//! - `AOARB`: the arbitrator, the source of the command timeline (lines containing `MAIN`)
//!   and of frame skip events
//! - `fastdiagn`: actuator failures and safety shutdowns (RIP)
//! - `housekeeper`: safety shutdowns (RIP)
//!
//! ## Configuration
//!
//! The CLI accepts the day, side and log path on the command line, or a YAML file of the form
//!
//! ```yml
//! day: '20210304'
//! side: R
//! log_path: /path/to/logs
//! html: false
//! output_path: .
//! verbose: false
//! ```
//!
//! ## Output
//!
//! A report is written to stdout, as plain text or as an HTML page (which expects an
//! `aotable.css` stylesheet next to it). It lists the point events of the day and, for each
//! kind of command, every occurrence with its outcome and the overall success rate.
//!
//! Two CSV tables accumulate results over many days in the output directory:
//!
//! ```text
//! cmd_<side>.csv  - day,hour,command,elapsed
//! data_<side>.csv - day,hour,time,time_h,open,open_h,setup,aosetup,telsetup,offsets,wfs,mode,magnitude
//! ```
//!
//! Rerunning a day replaces that day's rows.
pub mod command;
pub mod config;
pub mod constants;
pub mod csv_table;
pub mod detectors;
pub mod error;
pub mod event;
pub mod extractor;
pub mod log_source;
pub mod observation;
pub mod process;
pub mod report;
pub mod search;
pub mod timestamp;
