//! 基于位置的点八叉树
//! 叶子节点持有负载，超过分裂策略的限制时一分为八，并按各负载的位置下沉。
//! 分裂是单向的，没有删除和合并，节点数量单调不减。
//! 采用SlotMap，内部用键来引用八叉节点，子槽位用null键表示还未创建。

use std::mem;

use log::trace;
use nalgebra::Point3;
use num_traits::{One, Zero};
use parry3d::{bounding_volume::Aabb, math::Real};
use pi_slotmap::{Key, SlotMap};
use thiserror::Error;

use crate::oct_helper;

/// 计数模式下分裂的最大深度。位置不同但极其接近的负载在到达该深度之前就能分开，
/// 到达该深度仍未分开的，叶子直接接受超量负载，避免无限分裂。
const DEEP_MAX: usize = 64;

/// 分裂策略，二选一，建树时指定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    /// 按负载数分裂：叶子的负载数超过该值即分裂
    Count(usize),
    /// 按深度分裂：叶子深度小于该值即分裂，到达该深度后负载数不限
    Depth(usize),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OctError {
    /// 世界边长必须为正的有限值，建树时检查
    #[error("world size must be positive and finite")]
    InvalidWorldSize,
    /// 分裂限制必须为正，建树时检查
    #[error("split limit must be positive")]
    InvalidLimit,
    /// 位置在根包围盒之外，插入会原样返回，不是致命错误
    #[error("position out of world bounds")]
    OutOfBounds,
}

/// 负载自带位置的能力
pub trait HasPosition {
    fn position(&self) -> Point3<Real>;
}

/// 插入项。插入时就解析出权威位置，分裂下沉时始终按该位置计算槽位
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<T> {
    /// 仅位置，位置本身即负载
    Point(Point3<Real>),
    /// 位置及其绑定的负载
    Payload(Point3<Real>, T),
}

impl<T> Entry<T> {
    /// 该项的权威位置
    #[inline]
    pub fn position(&self) -> Point3<Real> {
        match self {
            Entry::Point(p) => *p,
            Entry::Payload(p, _) => *p,
        }
    }

    /// 绑定的负载，仅位置项返回None
    pub fn bind(&self) -> Option<&T> {
        match self {
            Entry::Point(_) => None,
            Entry::Payload(_, bind) => Some(bind),
        }
    }
}

/// 八叉节点，表示一个立方体区域
#[derive(Debug, Clone)]
pub struct OctNode<K: Key, T> {
    center: Point3<Real>,   // 立方体中心点
    size: Real,             // 立方体边长
    depth: usize,           // 距根节点的深度，根为0
    leaf: bool,             // 是否叶子节点
    entries: Vec<Entry<T>>, // 叶子节点持有的负载，保持插入顺序
    childs: [K; 8],         // 子节点键，null表示该槽位还未创建
}

impl<K: Key, T> OctNode<K, T> {
    fn new(center: Point3<Real>, size: Real, depth: usize) -> Self {
        OctNode {
            center,
            size,
            depth,
            leaf: true,
            entries: Vec::new(),
            childs: [K::null(); 8],
        }
    }

    /// 立方体中心点
    pub fn center(&self) -> Point3<Real> {
        self.center
    }

    /// 立方体边长
    pub fn size(&self) -> Real {
        self.size
    }

    /// 距根节点的深度
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 是否叶子节点
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// 持有的负载列表，非叶子节点为空
    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    /// 指定槽位的子节点键，null表示该槽位还未创建
    pub fn child(&self, index: usize) -> K {
        self.childs[index]
    }

    /// 该立方体的包围盒
    pub fn aabb(&self) -> Aabb {
        oct_helper::make_aabb(&self.center, self.size)
    }
}

///
/// 点八叉树结构体
///
/// 边界检查只在根包围盒上做一次，下沉过程信任槽位计算的结果
///
pub struct OctTree<K: Key, T> {
    slab: SlotMap<K, OctNode<K, T>>, // 所有八叉节点，键只由树自己产生，外部无法增删
    root_key: K,
    world_aabb: Aabb, // 根包围盒
    policy: SplitPolicy,
    len: usize, // 已插入的负载数量
}

impl<K: Key, T> OctTree<K, T> {
    /// 构建树
    ///
    /// 需传入世界边长（根立方体的边长）、原点（根立方体的中心点）及分裂策略。
    /// 世界边长必须为正的有限值，分裂限制必须为正，否则在这里拒绝。
    pub fn new(
        world_size: Real,
        origin: Point3<Real>,
        policy: SplitPolicy,
    ) -> Result<Self, OctError> {
        if !world_size.is_finite() || world_size <= Real::zero() {
            return Err(OctError::InvalidWorldSize);
        }
        let policy = match policy {
            SplitPolicy::Count(0) | SplitPolicy::Depth(0) => return Err(OctError::InvalidLimit),
            // 深度限制超过DEEP_MAX时收紧
            SplitPolicy::Depth(limit) if limit > DEEP_MAX => SplitPolicy::Depth(DEEP_MAX),
            p => p,
        };
        let mut slab: SlotMap<K, OctNode<K, T>> = SlotMap::with_key();
        let root_key = slab.insert(OctNode::new(origin, world_size, 0));
        Ok(OctTree {
            slab,
            root_key,
            world_aabb: oct_helper::make_aabb(&origin, world_size),
            policy,
            len: 0,
        })
    }

    /// 在指定位置插入一个负载
    pub fn add(&mut self, point: Point3<Real>, bind: T) -> Result<(), OctError> {
        self.insert(Entry::Payload(point, bind))
    }

    /// 插入一个自带位置的负载，位置取自负载本身
    pub fn add_positioned(&mut self, bind: T) -> Result<(), OctError>
    where
        T: HasPosition,
    {
        let point = bind.position();
        self.insert(Entry::Payload(point, bind))
    }

    /// 只插入位置，位置本身即负载
    pub fn add_point(&mut self, point: Point3<Real>) -> Result<(), OctError> {
        self.insert(Entry::Point(point))
    }

    /// 查询指定位置所在叶子的负载列表
    /// + 位置越界或该路径上没有叶子时返回None，空叶子返回空列表
    pub fn query(&self, point: Point3<Real>) -> Option<&[Entry<T>]> {
        if !self.world_aabb.contains_local_point(&point) {
            return None;
        }
        let mut cur = self.root_key;
        loop {
            let node = unsafe { self.slab.get_unchecked(cur) };
            if node.leaf {
                return Some(&node.entries);
            }
            let next = node.childs[oct_helper::get_child(&node.center, &point)];
            if next.is_null() {
                return None;
            }
            cur = next;
        }
    }

    /// 深度优先遍历所有叶子节点，按槽位升序访问子节点，空槽位跳过
    pub fn leaves(&self) -> LeafIter<'_, K, T> {
        LeafIter {
            slab: &self.slab,
            stack: vec![self.root_key],
        }
    }

    /// 获取指定键的节点
    /// + 该接口返回Option
    pub fn get(&self, id: K) -> Option<&OctNode<K, T>> {
        self.slab.get(id)
    }

    /// 根节点的键
    pub fn root(&self) -> K {
        self.root_key
    }

    /// 根包围盒
    pub fn bounds(&self) -> &Aabb {
        &self.world_aabb
    }

    /// 分裂策略
    pub fn policy(&self) -> SplitPolicy {
        self.policy
    }

    /// 获得负载数量
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn insert(&mut self, entry: Entry<T>) -> Result<(), OctError> {
        // 根包围盒检查，两端都是闭区间
        if !self.world_aabb.contains_local_point(&entry.position()) {
            return Err(OctError::OutOfBounds);
        }
        self.down(self.root_key, entry);
        self.len += 1;
        Ok(())
    }

    // 从指定节点开始下沉插入。调用方保证位置已在该节点范围内
    fn down(&mut self, start: K, entry: Entry<T>) {
        let point = entry.position();
        let mut cur = start;
        loop {
            let node = unsafe { self.slab.get_unchecked_mut(cur) };
            if node.leaf {
                node.entries.push(entry);
                if self.need_split(cur) {
                    self.split(cur);
                }
                return;
            }
            let i = oct_helper::get_child(&node.center, &point);
            let next = node.childs[i];
            if next.is_null() {
                // 槽位为空，新建叶子：边长折半，中心按槽位偏移，持有这一个负载
                let mut leaf = OctNode::new(
                    oct_helper::create_child(&node.center, node.size, i),
                    node.size / (Real::one() + Real::one()),
                    node.depth + 1,
                );
                leaf.entries.push(entry);
                let id = self.slab.insert(leaf);
                unsafe { self.slab.get_unchecked_mut(cur) }.childs[i] = id;
                return;
            }
            cur = next;
        }
    }

    // 评估分裂策略。计数模式下，负载全部重合或到达最大深度时不再分裂
    fn need_split(&self, id: K) -> bool {
        let node = unsafe { self.slab.get_unchecked(id) };
        match self.policy {
            SplitPolicy::Count(limit) => {
                node.entries.len() > limit
                    && node.depth < DEEP_MAX
                    && !all_coincident(&node.entries)
            }
            SplitPolicy::Depth(limit) => node.depth < limit,
        }
    }

    // 分裂叶子节点：快照负载并清空，按各自的权威位置重新下沉，可能级联分裂下一层
    fn split(&mut self, id: K) {
        let (depth, entries) = {
            let node = unsafe { self.slab.get_unchecked_mut(id) };
            node.leaf = false;
            (node.depth, mem::take(&mut node.entries))
        };
        trace!("split node, depth: {}, entries: {}", depth, entries.len());
        for entry in entries {
            self.down(id, entry);
        }
    }
}

// 判断负载的位置是否全部重合
fn all_coincident<T>(entries: &[Entry<T>]) -> bool {
    let first = match entries.first() {
        Some(e) => e.position(),
        None => return true,
    };
    for e in &entries[1..] {
        if e.position() != first {
            return false;
        }
    }
    true
}

/// 叶子节点的深度优先迭代器，只产出叶子，惰性推进，可重新开始
#[derive(Clone)]
pub struct LeafIter<'a, K: Key, T> {
    slab: &'a SlotMap<K, OctNode<K, T>>,
    stack: Vec<K>,
}

impl<'a, K: Key, T> Iterator for LeafIter<'a, K, T> {
    type Item = (K, &'a OctNode<K, T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = unsafe { self.slab.get_unchecked(id) };
            if node.leaf {
                return Some((id, node));
            }
            // 逆序压栈，出栈时即按槽位升序
            for i in (0..8).rev() {
                let child = node.childs[i];
                if !child.is_null() {
                    self.stack.push(child);
                }
            }
        }
        None
    }
}

#[cfg(test)]
use pi_null::Null;
#[cfg(test)]
use pi_slotmap::DefaultKey;

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
struct TestOb {
    id: usize,
    pos: Point3<Real>,
}

#[cfg(test)]
impl HasPosition for TestOb {
    fn position(&self) -> Point3<Real> {
        self.pos
    }
}

#[test]
fn test_insert_query() {
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(10)).unwrap();
    tree.add(Point3::new(10.0, 10.0, 10.0), 1).unwrap();
    tree.add(Point3::new(-10.0, -10.0, -10.0), 2).unwrap();
    tree.add(Point3::new(30.0, -20.0, 5.0), 3).unwrap();
    assert_eq!(tree.len(), 3);
    let r = tree.query(Point3::new(10.0, 10.0, 10.0)).unwrap();
    assert!(r.iter().any(|e| e.bind() == Some(&1)));
    let r = tree.query(Point3::new(-10.0, -10.0, -10.0)).unwrap();
    assert!(r.iter().any(|e| e.bind() == Some(&2)));
}

#[test]
fn test_empty_tree() {
    let tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(10)).unwrap();
    assert!(tree.is_empty());
    // 根是空叶子，范围内的查询返回空列表而不是未命中
    let r = tree.query(Point3::new(0.0, 0.0, 0.0)).unwrap();
    assert!(r.is_empty());
    assert_eq!(tree.leaves().count(), 1);
}

#[test]
fn test_out_of_bounds() {
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(10)).unwrap();
    assert_eq!(
        tree.add(Point3::new(51.0, 0.0, 0.0), 1),
        Err(OctError::OutOfBounds)
    );
    assert_eq!(
        tree.add(Point3::new(0.0, -50.5, 0.0), 2),
        Err(OctError::OutOfBounds)
    );
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.query(Point3::new(0.0, 0.0, 50.5)), None);
    // 边界上的位置在范围内，两端都是闭区间
    assert!(tree.add(Point3::new(50.0, 50.0, 50.0), 3).is_ok());
    assert!(tree.add(Point3::new(-50.0, -50.0, -50.0), 4).is_ok());
    assert!(tree.query(Point3::new(50.0, -50.0, 50.0)).is_some());
}

#[test]
fn test_invalid_config() {
    let origin = Point3::new(0.0, 0.0, 0.0);
    assert_eq!(
        OctTree::<DefaultKey, usize>::new(0.0, origin, SplitPolicy::Count(10)).err(),
        Some(OctError::InvalidWorldSize)
    );
    assert_eq!(
        OctTree::<DefaultKey, usize>::new(-5.0, origin, SplitPolicy::Count(10)).err(),
        Some(OctError::InvalidWorldSize)
    );
    assert_eq!(
        OctTree::<DefaultKey, usize>::new(Real::NAN, origin, SplitPolicy::Count(10)).err(),
        Some(OctError::InvalidWorldSize)
    );
    assert_eq!(
        OctTree::<DefaultKey, usize>::new(100.0, origin, SplitPolicy::Count(0)).err(),
        Some(OctError::InvalidLimit)
    );
    assert_eq!(
        OctTree::<DefaultKey, usize>::new(100.0, origin, SplitPolicy::Depth(0)).err(),
        Some(OctError::InvalidLimit)
    );
    // 过深的深度限制被收紧
    let tree =
        OctTree::<DefaultKey, usize>::new(100.0, origin, SplitPolicy::Depth(1000)).unwrap();
    assert_eq!(tree.policy(), SplitPolicy::Depth(DEEP_MAX));
}

#[test]
fn test_get_missing_key() {
    // 节点键只由树自己产生，外来的键走get，查不到返回None
    let tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(10)).unwrap();
    assert!(tree.get(DefaultKey::null()).is_none());
    assert!(tree.get(tree.root()).is_some());
}

#[test]
fn test_split_two_octants() {
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(1)).unwrap();
    tree.add(Point3::new(10.0, 10.0, 10.0), 1).unwrap();
    tree.add(Point3::new(-10.0, -10.0, -10.0), 2).unwrap();
    let root = tree.get(tree.root()).unwrap();
    assert!(!root.is_leaf());
    // 两个负载分别落在7号和0号槽位
    let hi = tree.get(root.child(7)).expect("branch 7");
    let lo = tree.get(root.child(0)).expect("branch 0");
    assert!(hi.is_leaf() && lo.is_leaf());
    assert_eq!(hi.entries().len(), 1);
    assert_eq!(lo.entries().len(), 1);
    assert_eq!(hi.entries()[0].bind(), Some(&1));
    assert_eq!(lo.entries()[0].bind(), Some(&2));
    // 子节点边长折半，中心沿每轴偏移父边长的四分之一
    assert_eq!(hi.size(), 50.0);
    assert_eq!(hi.depth(), 1);
    assert_eq!(hi.center(), Point3::new(25.0, 25.0, 25.0));
    assert_eq!(lo.center(), Point3::new(-25.0, -25.0, -25.0));
    // 其余槽位为空
    for i in 1..7 {
        assert!(root.child(i).is_null());
    }
}

#[test]
fn test_boundary_tie() {
    // 恰好落在分界面上的位置，判定到大的一侧
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(1)).unwrap();
    tree.add(Point3::new(10.0, 10.0, 10.0), 1).unwrap();
    tree.add(Point3::new(-10.0, -10.0, -10.0), 2).unwrap();
    let r = tree.query(Point3::new(0.0, 10.0, 10.0)).unwrap();
    assert!(r.iter().any(|e| e.bind() == Some(&1)));
}

#[test]
fn test_not_found_path() {
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(1)).unwrap();
    tree.add(Point3::new(10.0, 10.0, 10.0), 1).unwrap();
    tree.add(Point3::new(-10.0, -10.0, -10.0), 2).unwrap();
    // 该八分区从未有负载落入，槽位为空
    assert_eq!(tree.query(Point3::new(10.0, -10.0, 10.0)), None);
}

#[test]
fn test_coincident_overflow() {
    // 11个负载位置完全重合，无法分开，计数限制允许超量，根保持单个叶子
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(10)).unwrap();
    for i in 0..11 {
        tree.add(Point3::new(5.0, 5.0, 5.0), i).unwrap();
    }
    let leaves: Vec<_> = tree.leaves().collect();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].1.entries().len(), 11);
    assert!(tree.get(tree.root()).unwrap().is_leaf());
    assert_eq!(tree.query(Point3::new(5.0, 5.0, 5.0)).unwrap().len(), 11);
}

#[test]
fn test_inseparable_positions() {
    // 两个相邻但不相等的浮点位置：世界边长只有1024附近1.75个ulp，
    // 子节点中心的偏移量从第一层起就不足半个ulp，舍入后中心点不再移动，
    // 两个位置永远判定到同一槽位，分裂到最大深度后叶子接受超量负载
    let u: Real = 0.0001220703125; // 1024附近一个ulp，即2的-13次方
    let origin = Point3::new(1024.0, 1024.0, 1024.0);
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(1.75 * u, origin, SplitPolicy::Count(1)).unwrap();
    let p = Point3::new(1024.0, 1024.0, 1024.0);
    let q = Point3::new(1024.0 + u, 1024.0 + u, 1024.0 + u);
    tree.add(p, 1).unwrap();
    tree.add(q, 2).unwrap();
    assert_eq!(tree.len(), 2);
    let leaves: Vec<_> = tree.leaves().collect();
    assert_eq!(leaves.len(), 1);
    let (_, leaf) = leaves[0];
    assert_eq!(leaf.depth(), DEEP_MAX);
    assert_eq!(leaf.entries().len(), 2);
    let r = tree.query(q).unwrap();
    assert!(r.iter().any(|e| e.bind() == Some(&1)));
    assert!(r.iter().any(|e| e.bind() == Some(&2)));
}

#[test]
fn test_depth_mode() {
    // 深度模式：未达到深度限制就分裂，到达后重合的负载全部堆在同一个叶子里
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Depth(3)).unwrap();
    for i in 0..5 {
        tree.add(Point3::new(5.0, 5.0, 5.0), i).unwrap();
    }
    let leaves: Vec<_> = tree.leaves().collect();
    assert_eq!(leaves.len(), 1);
    let (_, leaf) = leaves[0];
    assert_eq!(leaf.depth(), 3);
    assert_eq!(leaf.entries().len(), 5);
    assert_eq!(leaf.size(), 12.5);
}

#[test]
fn test_leaf_order() {
    // 叶子按槽位升序被访问
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(1)).unwrap();
    tree.add(Point3::new(10.0, 10.0, 10.0), 7).unwrap();
    tree.add(Point3::new(-10.0, -10.0, -10.0), 0).unwrap();
    let binds: Vec<usize> = tree
        .leaves()
        .flat_map(|(_, n)| n.entries().iter().map(|e| *e.bind().unwrap()))
        .collect();
    assert_eq!(binds, vec![0, 7]);
}

#[test]
fn test_query_idempotent() {
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(2)).unwrap();
    for (i, p) in [
        Point3::new(10.0, 10.0, 10.0),
        Point3::new(-10.0, 10.0, 10.0),
        Point3::new(10.0, -10.0, 10.0),
        Point3::new(10.0, 10.0, -10.0),
        Point3::new(-30.0, -30.0, -30.0),
    ]
    .iter()
    .enumerate()
    {
        tree.add(*p, i).unwrap();
    }
    let p = Point3::new(10.0, 10.0, 10.0);
    assert_eq!(tree.query(p), tree.query(p));
    // 两次遍历的结果一致
    let a: Vec<_> = tree.leaves().map(|(id, _)| id).collect();
    let b: Vec<_> = tree.leaves().map(|(id, _)| id).collect();
    assert_eq!(a, b);
}

#[test]
fn test_point_as_value() {
    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(100.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(10)).unwrap();
    let p = Point3::new(1.0, 2.0, 3.0);
    tree.add_point(p).unwrap();
    let r = tree.query(p).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].position(), p);
    assert_eq!(r[0].bind(), None);
}

#[test]
fn test_positioned_payload() {
    let mut tree: OctTree<DefaultKey, TestOb> =
        OctTree::new(200.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(2)).unwrap();
    let mut obs = Vec::new();
    for i in 0..8usize {
        let pos = Point3::new(
            if i & 4 == 0 { -40.0 } else { 40.0 },
            if i & 2 == 0 { -40.0 } else { 40.0 },
            if i & 1 == 0 { -40.0 } else { 40.0 },
        );
        obs.push(TestOb { id: i, pos });
    }
    for ob in &obs {
        tree.add_positioned(ob.clone()).unwrap();
    }
    assert_eq!(tree.len(), 8);
    for ob in &obs {
        let r = tree.query(ob.pos).unwrap();
        assert!(r.iter().any(|e| e.bind().map(|o| o.id) == Some(ob.id)));
    }
}

#[test]
fn test_no_loss() {
    use pcg_rand::Pcg32;
    use rand::{Rng, SeedableRng};

    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(1000.0, Point3::new(0.0, 0.0, 0.0), SplitPolicy::Count(4)).unwrap();
    let mut rng = Pcg32::seed_from_u64(1111);
    let mut points = Vec::new();
    for i in 0..1000 {
        let p = Point3::new(
            rng.gen_range(-500.0f32..500.0),
            rng.gen_range(-500.0f32..500.0),
            rng.gen_range(-500.0f32..500.0),
        );
        tree.add(p, i).unwrap();
        points.push(p);
    }
    assert_eq!(tree.len(), 1000);
    // 遍历所有叶子，负载总数一个不丢
    let total: usize = tree.leaves().map(|(_, n)| n.entries().len()).sum();
    assert_eq!(total, 1000);
    // 每个已插入的位置都能查到对应的负载
    for (i, p) in points.iter().enumerate() {
        let r = tree.query(*p).unwrap();
        assert!(r.iter().any(|e| e.bind() == Some(&i)));
    }
    // 计数模式下，位置不重合的叶子不会超过限制
    for (_, n) in tree.leaves() {
        assert!(n.entries().len() <= 4);
    }
}

#[test]
fn test_child_invariants() {
    use pcg_rand::Pcg32;
    use rand::{Rng, SeedableRng};

    let mut tree: OctTree<DefaultKey, usize> =
        OctTree::new(256.0, Point3::new(8.0, -8.0, 0.0), SplitPolicy::Count(2)).unwrap();
    let mut rng = Pcg32::seed_from_u64(42);
    for i in 0..300 {
        let p = Point3::new(
            rng.gen_range(-120.0f32..136.0),
            rng.gen_range(-136.0f32..120.0),
            rng.gen_range(-128.0f32..128.0),
        );
        tree.add(p, i).unwrap();
    }
    // 自根向下检查：子节点边长恰为一半、深度加一、中心按槽位偏移四分之一边长
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let node = tree.get(id).unwrap();
        if node.is_leaf() {
            continue;
        }
        for i in 0..8 {
            let child = node.child(i);
            if child.is_null() {
                continue;
            }
            let c = tree.get(child).unwrap();
            assert_eq!(c.size(), node.size() / 2.0);
            assert_eq!(c.depth(), node.depth() + 1);
            assert_eq!(
                c.center(),
                oct_helper::create_child(&node.center(), node.size(), i)
            );
            stack.push(child);
        }
    }
}
