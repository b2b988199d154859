mod config;

mod init;

mod patterns;

mod problem;

mod report;

mod submission;

mod verdict;

mod verifier;

use anyhow::Result;

fn main() -> Result<()> {
    init::main()
}
