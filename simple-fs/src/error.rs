use crate::block_dev::DiskError;

/// 文件系统操作的失败原因，与任何成功返回值严格区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// 底层块设备读写失败
    Disk(DiskError),
    /// 超级块魔数不匹配
    BadMagic,
    /// 句柄已经挂载
    AlreadyMounted,
    /// 句柄尚未挂载
    NotMounted,
    /// inode 编号越界或槽位未分配
    NotFound,
    /// inode 表没有空槽位
    OutOfInodes,
}

impl From<DiskError> for FsError {
    #[inline]
    fn from(e: DiskError) -> Self {
        Self::Disk(e)
    }
}
