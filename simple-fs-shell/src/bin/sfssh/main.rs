mod cli;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use simple_fs::{BlockDevice, DebugReport, DiskError, FsError, SimpleFileSystem, BLOCK_SIZE};
use simple_fs_shell::BlockFile;

use cli::{Cli, Command};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sfssh: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> io::Result<()> {
    let device: Arc<dyn BlockDevice> = Arc::new(BlockFile::open(&cli.image, cli.blocks)?);

    // format 与 debug 直接面向设备，其余命令先挂载
    match &cli.command {
        Command::Format => return SimpleFileSystem::format(device.as_ref()).map_err(fs_err),
        Command::Debug => {
            print_report(&SimpleFileSystem::debug(device.as_ref()).map_err(fs_err)?);
            return Ok(());
        }
        _ => {}
    }

    let mut fs = SimpleFileSystem::new();
    fs.mount(device).map_err(fs_err)?;

    match &cli.command {
        Command::Format | Command::Debug => unreachable!("handled before mounting"),
        Command::Create => {
            let inumber = fs.create().map_err(fs_err)?;
            println!("created inode {inumber}");
        }
        Command::Remove { inumber } => fs.remove(*inumber).map_err(fs_err)?,
        Command::Stat { inumber } => {
            let size = fs.stat(*inumber).map_err(fs_err)?;
            println!("inode {inumber} has size {size} bytes");
        }
        Command::Cat { inumber } => copy_out(&fs, *inumber, &mut io::stdout().lock())?,
        Command::Copyin { source, inumber } => copy_in(&mut fs, source, *inumber)?,
        Command::Copyout { inumber, target } => {
            let mut file = File::create(target)?;
            copy_out(&fs, *inumber, &mut file)?;
        }
    }

    fs.unmount().map_err(fs_err)
}

/// 把宿主机文件按块大小的步长灌进指定 inode
fn copy_in(fs: &mut SimpleFileSystem, source: &Path, inumber: u32) -> io::Result<()> {
    let mut file = File::open(source)?;
    let mut buf = [0u8; BLOCK_SIZE];
    let mut offset = 0;

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }

        let written = fs.write(inumber, &buf[..read], offset).map_err(fs_err)?;
        offset += written;
        if written < read {
            log::warn!("disk full, copied {offset} bytes only");
            break;
        }
    }

    Ok(())
}

fn copy_out(fs: &SimpleFileSystem, inumber: u32, out: &mut impl Write) -> io::Result<()> {
    let size = fs.stat(inumber).map_err(fs_err)? as usize;
    let mut buf = [0u8; BLOCK_SIZE];
    let mut offset = 0;

    while offset < size {
        let read = fs.read(inumber, &mut buf, offset).map_err(fs_err)?;
        if read == 0 {
            break;
        }
        out.write_all(&buf[..read])?;
        offset += read;
    }

    Ok(())
}

fn print_report(report: &DebugReport) {
    println!("SuperBlock:");
    println!(
        "    magic number is {}",
        if report.magic_valid { "valid" } else { "invalid" }
    );
    println!("    {} blocks", report.blocks);
    println!("    {} inode blocks", report.inode_blocks);
    println!("    {} inodes", report.inodes);

    for file in &report.files {
        println!("Inode {}", file.number);
        println!("    size: {} bytes", file.size);
        println!("    direct blocks: {}", file.direct_blocks);
    }
}

fn fs_err(e: FsError) -> io::Error {
    io::Error::other(match e {
        FsError::Disk(DiskError::OutOfRange) => "block number out of range",
        FsError::Disk(DiskError::InvalidBuffer) => "buffer is not a whole block",
        FsError::Disk(DiskError::Io) => "disk I/O failure",
        FsError::BadMagic => "not a SimpleFS image (bad magic)",
        FsError::AlreadyMounted => "file system is already mounted",
        FsError::NotMounted => "file system is not mounted",
        FsError::NotFound => "no such inode",
        FsError::OutOfInodes => "inode table is full",
    })
}
