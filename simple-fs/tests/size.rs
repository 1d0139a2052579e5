use std::mem;

use simple_fs::{Block, Inode, SuperBlock, BLOCK_SIZE, INODES_PER_BLOCK};

#[test]
fn on_disk_layout() {
    assert_eq!(32, mem::size_of::<Inode>());
    assert_eq!(BLOCK_SIZE, mem::size_of::<Inode>() * INODES_PER_BLOCK);
    assert_eq!(16, mem::size_of::<SuperBlock>());
    assert_eq!(BLOCK_SIZE, mem::size_of::<Block>());
}
