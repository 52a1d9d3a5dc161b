//! 基于位置的点八叉树
//！采用二进制掩码 表达xyz的大小， child&4 == 0 表示x为小，否则为大。
//！采用SlotMap，内部用键来引用八叉节点。这样内存连续，八叉树本身可以快速拷贝。
//！只有插入和查询，没有删除和合并。单线程使用，多线程共享需要调用方自行加锁。

pub mod oct_helper;
pub mod tree;

pub use oct_helper::*;
pub use tree::*;
