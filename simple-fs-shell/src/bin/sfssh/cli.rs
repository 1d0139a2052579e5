use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// Path to the disk image
    #[arg(long, short)]
    pub image: PathBuf,

    /// Number of blocks in the disk image
    #[arg(long, short)]
    pub blocks: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a fresh file system onto the image
    Format,
    /// Print a summary of the super block and the inode table
    Debug,
    /// Allocate a new inode and print its number
    Create,
    /// Remove an inode and free its blocks
    Remove { inumber: u32 },
    /// Print the size of an inode
    Stat { inumber: u32 },
    /// Copy an inode's contents to stdout
    Cat { inumber: u32 },
    /// Copy a host file into an inode
    Copyin { source: PathBuf, inumber: u32 },
    /// Copy an inode's contents to a host file
    Copyout { inumber: u32, target: PathBuf },
}
