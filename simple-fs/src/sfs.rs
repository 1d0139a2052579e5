//! # 文件系统操作层
//!
//! 对外公开的文件系统表面：格式化、挂载/卸载，以及对匿名文件的
//! 创建、删除、读写。命名空间是扁平的 inode 编号，没有目录层。
//!
//! 所有操作都在调用者线程上同步完成；除了内存中的空闲块位图，
//! 没有任何缓存，索引节点的每次读取都直达磁盘。

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::block_dev::BlockDevice;
use crate::error::FsError;
use crate::layout::{Bitmap, Block, Inode, SuperBlock};
use crate::{BLOCK_SIZE, INODES_PER_BLOCK, MAX_FILE_SIZE, POINTERS_PER_BLOCK, POINTERS_PER_INODE};

/// 文件系统句柄。
///
/// 挂载后独占持有超级块副本与空闲块位图，借用块设备直到卸载；
/// 同一个句柄不可重复挂载。
pub struct SimpleFileSystem {
    mounted: Option<Mounted>,
}

/// 挂载期间存活的状态
struct Mounted {
    device: Arc<dyn BlockDevice>,
    super_block: SuperBlock,
    bitmap: Bitmap,
}

/// 写路径中的间接索引块缓存，只在单次调用内存活
struct IndirectCache {
    block: Option<Block>,
    dirty: bool,
}

impl SimpleFileSystem {
    #[inline]
    pub const fn new() -> Self {
        Self { mounted: None }
    }

    /// 无条件格式化设备：写入超级块，清空索引节点表。
    /// 数据块不清零。不要格式化已挂载的设备。
    pub fn format(device: &dyn BlockDevice) -> Result<(), FsError> {
        let mut block = Block::zeroed();
        block.as_super_mut().init(device.total_blocks() as u32);
        let inode_blocks = block.as_super().inode_blocks as usize;
        block.write_to(device, 0)?;

        let empty = Block::zeroed();
        for i in 1..=inode_blocks {
            empty.write_to(device, i)?;
        }
        Ok(())
    }

    /// 校验魔数，复制超级块，重建空闲块位图。
    pub fn mount(&mut self, device: Arc<dyn BlockDevice>) -> Result<(), FsError> {
        if self.mounted.is_some() {
            return Err(FsError::AlreadyMounted);
        }

        let block = Block::read_from(device.as_ref(), 0)?;
        let super_block = *block.as_super();
        if !super_block.is_valid() {
            log::error!("bad magic in super block, refusing to mount");
            return Err(FsError::BadMagic);
        }

        let bitmap = rebuild_bitmap(device.as_ref(), &super_block)?;
        log::info!(
            "mounted: {} blocks, {} inode blocks, {} inodes",
            super_block.blocks,
            super_block.inode_blocks,
            super_block.inodes
        );

        self.mounted = Some(Mounted {
            device,
            super_block,
            bitmap,
        });
        Ok(())
    }

    /// 丢弃位图并归还设备引用
    pub fn unmount(&mut self) -> Result<(), FsError> {
        self.mounted.take().map(|_| ()).ok_or(FsError::NotMounted)
    }

    /// 线性扫描索引节点表，占用首个空槽位并立即落盘，返回其编号
    pub fn create(&mut self) -> Result<u32, FsError> {
        let fs = self.fs_mut()?;

        for i in 1..=fs.super_block.inode_blocks as usize {
            let mut block = Block::read_from(fs.device.as_ref(), i)?;
            let slot = block.as_inodes().iter().position(|inode| !inode.is_valid());
            if let Some(slot) = slot {
                block.as_inodes_mut()[slot].init();
                block.write_to(fs.device.as_ref(), i)?;
                return Ok(((i - 1) * INODES_PER_BLOCK + slot) as u32);
            }
        }

        Err(FsError::OutOfInodes)
    }

    /// 释放 inode 引用的全部块并清空其记录。
    /// 释放只发生在位图里，数据块的内容原样留在盘上。
    pub fn remove(&mut self, inumber: u32) -> Result<(), FsError> {
        let fs = self.fs_mut()?;
        let inode = fs.load_inode(inumber)?;

        for &p in inode.direct.iter().filter(|&&p| p != 0) {
            fs.bitmap.free(p);
        }

        if inode.uses_indirect() && inode.indirect != 0 {
            let indirect = Block::read_from(fs.device.as_ref(), inode.indirect as usize)?;
            for &p in indirect.as_pointers().iter().filter(|&&p| p != 0) {
                fs.bitmap.free(p);
            }
            fs.bitmap.free(inode.indirect);
        }

        fs.save_inode(inumber, &Inode::default())
    }

    /// 返回文件大小（字节）
    pub fn stat(&self, inumber: u32) -> Result<u32, FsError> {
        self.fs()?.load_inode(inumber).map(|inode| inode.size)
    }

    /// 从指定字节偏移读出至多 `buf.len()` 字节，返回实际读到的字节数。
    /// 超出文件末尾的部分不读；`offset` 不小于文件大小时返回 0。
    pub fn read(&self, inumber: u32, buf: &mut [u8], offset: usize) -> Result<usize, FsError> {
        self.fs()?.read_at(inumber, buf, offset)
    }

    /// 从指定字节偏移写入 `buf`，返回实际写入的字节数。
    ///
    /// 途中缺块就向位图申请；空间耗尽时停止，已写入的字节保留，
    /// 返回值相应变短。写入起点越过文件末尾时，先把中间的空隙补零。
    pub fn write(&mut self, inumber: u32, buf: &[u8], offset: usize) -> Result<usize, FsError> {
        self.fs_mut()?.write_at(inumber, buf, offset)
    }

    /// 汇总超级块与索引节点表的现状。
    /// 魔数不合法时不再扫描索引节点表，其余字段按原样报告。
    pub fn debug(device: &dyn BlockDevice) -> Result<DebugReport, FsError> {
        let block = Block::read_from(device, 0)?;
        let super_block = block.as_super();

        let mut report = DebugReport {
            magic_valid: super_block.is_valid(),
            blocks: super_block.blocks,
            inode_blocks: super_block.inode_blocks,
            inodes: super_block.inodes,
            files: Vec::new(),
        };
        if !report.magic_valid {
            return Ok(report);
        }

        for i in 1..=super_block.inode_blocks as usize {
            let block = Block::read_from(device, i)?;
            for (slot, inode) in block.as_inodes().iter().enumerate() {
                if !inode.is_valid() {
                    continue;
                }
                report.files.push(InodeReport {
                    number: ((i - 1) * INODES_PER_BLOCK + slot) as u32,
                    size: inode.size,
                    direct_blocks: inode.direct.iter().filter(|&&p| p != 0).count() as u32,
                });
            }
        }

        Ok(report)
    }

    /// 查询某块在位图中是否已分配
    pub fn is_allocated(&self, block: u32) -> Result<bool, FsError> {
        self.fs().map(|fs| fs.bitmap.is_set(block))
    }

    /// 以磁盘上的索引节点表为准重建位图，并与内存中维护的比较。
    /// 一致返回真；用作测试与排障时的一致性检查。
    pub fn check(&self) -> Result<bool, FsError> {
        let fs = self.fs()?;
        let rebuilt = rebuild_bitmap(fs.device.as_ref(), &fs.super_block)?;
        Ok(rebuilt == fs.bitmap)
    }
}

impl SimpleFileSystem {
    #[inline]
    fn fs(&self) -> Result<&Mounted, FsError> {
        self.mounted.as_ref().ok_or(FsError::NotMounted)
    }

    #[inline]
    fn fs_mut(&mut self) -> Result<&mut Mounted, FsError> {
        self.mounted.as_mut().ok_or(FsError::NotMounted)
    }
}

impl Default for SimpleFileSystem {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Mounted {
    /// 每次读取都直达磁盘，索引节点表不在内存缓存
    fn load_inode(&self, inumber: u32) -> Result<Inode, FsError> {
        if inumber >= self.super_block.inodes {
            return Err(FsError::NotFound);
        }

        let (block_id, slot) = inode_pos(inumber);
        let block = Block::read_from(self.device.as_ref(), block_id)?;
        let inode = block.as_inodes()[slot];
        inode.is_valid().then_some(inode).ok_or(FsError::NotFound)
    }

    /// 读改写 inode 所在的块。
    /// inode 的每次状态变化都必须恰好经过这里一次。
    fn save_inode(&self, inumber: u32, inode: &Inode) -> Result<(), FsError> {
        let (block_id, slot) = inode_pos(inumber);
        let mut block = Block::read_from(self.device.as_ref(), block_id)?;
        block.as_inodes_mut()[slot] = *inode;
        block.write_to(self.device.as_ref(), block_id)?;
        Ok(())
    }

    fn read_at(&self, inumber: u32, buf: &mut [u8], offset: usize) -> Result<usize, FsError> {
        let inode = self.load_inode(inumber)?;

        let size = inode.size as usize;
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let length = buf.len().min(size - offset);

        // 间接索引块整个调用至多读取一次
        let mut indirect: Option<Block> = None;

        let mut copied = 0;
        while copied < length {
            let cursor = offset + copied;
            let inner = cursor % BLOCK_SIZE;
            let chunk = (length - copied).min(BLOCK_SIZE - inner);
            let dest = &mut buf[copied..copied + chunk];

            let p = self.locate_block(&inode, &mut indirect, cursor / BLOCK_SIZE)?;
            if p == 0 {
                // 稀疏洞：正常写入不会产生，读到时按零处理
                dest.fill(0);
            } else {
                let block = Block::read_from(self.device.as_ref(), p as usize)?;
                dest.copy_from_slice(&block.bytes()[inner..inner + chunk]);
            }

            copied += chunk;
        }

        Ok(length)
    }

    fn write_at(&mut self, inumber: u32, buf: &[u8], offset: usize) -> Result<usize, FsError> {
        let mut inode = self.load_inode(inumber)?;

        if buf.is_empty() || offset >= MAX_FILE_SIZE {
            return Ok(0);
        }
        let length = buf.len().min(MAX_FILE_SIZE - offset);

        let mut cache = IndirectCache {
            block: None,
            dirty: false,
        };

        // 文件不允许稀疏：写入起点越过末尾时，先把空隙补零
        let reached = self.fill_gap(&mut inode, &mut cache, offset)?;
        let written = if reached == offset {
            self.copy_in(&mut inode, &mut cache, buf, offset, length)?
        } else {
            0
        };

        let end = if written > 0 { offset + written } else { reached };
        inode.size = inode.size.max(end as u32);

        // 间接索引块分配了却一个字节都没送进去时撤销它，
        // 未越过直接容量的文件必须保持 indirect == 0
        if inode.size as usize <= BLOCK_SIZE * POINTERS_PER_INODE && inode.indirect != 0 {
            self.bitmap.free(inode.indirect);
            inode.indirect = 0;
            cache.dirty = false;
        }

        if cache.dirty {
            if let Some(block) = &cache.block {
                block.write_to(self.device.as_ref(), inode.indirect as usize)?;
            }
        }
        self.save_inode(inumber, &inode)?;

        Ok(written)
    }
}

impl Mounted {
    /// 只读解析逻辑块；0 表示该位置没有块
    fn locate_block(
        &self,
        inode: &Inode,
        indirect: &mut Option<Block>,
        block_index: usize,
    ) -> Result<u32, FsError> {
        if block_index < POINTERS_PER_INODE {
            return Ok(inode.direct[block_index]);
        }
        // 越过最大文件尺寸的索引只可能来自损坏的镜像，一律按洞处理
        if inode.indirect == 0 || block_index >= POINTERS_PER_INODE + POINTERS_PER_BLOCK {
            return Ok(0);
        }

        let block = match indirect {
            Some(block) => block,
            cached => cached.insert(Block::read_from(
                self.device.as_ref(),
                inode.indirect as usize,
            )?),
        };
        Ok(block.as_pointers()[block_index - POINTERS_PER_INODE])
    }

    /// 解析逻辑块并在缺块时向位图申请；返回空表示空间耗尽。
    /// 布尔值指示块是否为本次新分配，新块的盘上内容未初始化。
    fn prepare_block(
        &mut self,
        inode: &mut Inode,
        cache: &mut IndirectCache,
        block_index: usize,
    ) -> Result<Option<(u32, bool)>, FsError> {
        if block_index < POINTERS_PER_INODE {
            let p = inode.direct[block_index];
            if p != 0 {
                return Ok(Some((p, false)));
            }
            let Some(p) = self.bitmap.alloc() else {
                return Ok(None);
            };
            inode.direct[block_index] = p;
            return Ok(Some((p, true)));
        }

        let block = match &mut cache.block {
            Some(block) => block,
            cached if inode.indirect != 0 => cached.insert(Block::read_from(
                self.device.as_ref(),
                inode.indirect as usize,
            )?),
            cached => {
                // 首次越过直接指针容量：分配间接索引块并整块清零
                let Some(p) = self.bitmap.alloc() else {
                    return Ok(None);
                };
                inode.indirect = p;
                cache.dirty = true;
                cached.insert(Block::zeroed())
            }
        };
        let pointers = block.as_pointers_mut();

        let slot = block_index - POINTERS_PER_INODE;
        let p = pointers[slot];
        if p != 0 {
            return Ok(Some((p, false)));
        }
        let Some(p) = self.bitmap.alloc() else {
            return Ok(None);
        };
        pointers[slot] = p;
        cache.dirty = true;
        Ok(Some((p, true)))
    }

    /// 把 `[inode.size, to)` 的字节补零，返回实际推进到的位置。
    /// 空间耗尽时提前停下，已补零的部分保持可读。
    fn fill_gap(
        &mut self,
        inode: &mut Inode,
        cache: &mut IndirectCache,
        to: usize,
    ) -> Result<usize, FsError> {
        let mut cursor = inode.size as usize;
        while cursor < to {
            let inner = cursor % BLOCK_SIZE;
            let chunk = (to - cursor).min(BLOCK_SIZE - inner);

            let Some((p, fresh)) = self.prepare_block(inode, cache, cursor / BLOCK_SIZE)? else {
                return Ok(cursor);
            };

            // 新块整体清零即可；旧的边界块需要读改写抹掉过期字节
            let mut block = if fresh {
                Block::zeroed()
            } else {
                Block::read_from(self.device.as_ref(), p as usize)?
            };
            block.bytes_mut()[inner..inner + chunk].fill(0);
            block.write_to(self.device.as_ref(), p as usize)?;

            cursor += chunk;
        }

        Ok(to)
    }

    /// 把 `buf[..length]` 逐块落盘；途中分配不到新块就截断。
    /// 返回写入的字节数。
    fn copy_in(
        &mut self,
        inode: &mut Inode,
        cache: &mut IndirectCache,
        buf: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<usize, FsError> {
        let mut written = 0;
        while written < length {
            let cursor = offset + written;
            let inner = cursor % BLOCK_SIZE;
            let chunk = (length - written).min(BLOCK_SIZE - inner);

            let Some((p, fresh)) = self.prepare_block(inode, cache, cursor / BLOCK_SIZE)? else {
                break;
            };

            // 整块覆盖和新块不必读回，部分写入需要读改写
            let mut block = if chunk == BLOCK_SIZE || fresh {
                Block::zeroed()
            } else {
                Block::read_from(self.device.as_ref(), p as usize)?
            };
            block.bytes_mut()[inner..inner + chunk].copy_from_slice(&buf[written..written + chunk]);
            block.write_to(self.device.as_ref(), p as usize)?;

            written += chunk;
        }

        Ok(written)
    }
}

/// 由 inode 编号求出其所在块与块内槽位
#[inline]
fn inode_pos(inumber: u32) -> (usize, usize) {
    let inumber = inumber as usize;
    (1 + inumber / INODES_PER_BLOCK, inumber % INODES_PER_BLOCK)
}

/// 扫描索引节点表，把每个在用 inode 引用的块置位。
/// 未被任何在用 inode 引用的块视为空闲，即使其中还留有过期字节。
fn rebuild_bitmap(device: &dyn BlockDevice, super_block: &SuperBlock) -> Result<Bitmap, FsError> {
    let mut bitmap = Bitmap::new(super_block.blocks as usize, super_block.data_start());

    for i in 1..=super_block.inode_blocks as usize {
        let block = Block::read_from(device, i)?;
        for inode in block.as_inodes().iter().filter(|inode| inode.is_valid()) {
            for &p in inode.direct.iter().filter(|&&p| p != 0) {
                bitmap.set(p);
            }

            if inode.uses_indirect() && inode.indirect != 0 {
                bitmap.set(inode.indirect);
                let indirect = Block::read_from(device, inode.indirect as usize)?;
                for &p in indirect.as_pointers().iter().filter(|&&p| p != 0) {
                    bitmap.set(p);
                }
            }
        }
    }

    Ok(bitmap)
}

/// `debug` 的结构化汇总：超级块字段加上每个在用 inode 的概要。
/// 面向人类阅读与测试断言，不是机器接口。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugReport {
    pub magic_valid: bool,
    pub blocks: u32,
    pub inode_blocks: u32,
    pub inodes: u32,
    pub files: Vec<InodeReport>,
}

/// 单个在用 inode 的概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeReport {
    pub number: u32,
    pub size: u32,
    /// 非零直接指针的个数
    pub direct_blocks: u32,
}
