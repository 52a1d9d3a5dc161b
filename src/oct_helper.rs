//! 八叉相关接口
//! 二进制掩码表达xyz的大小：bit2为x，bit1为y，bit0为z，0表示小的一侧，1表示大的一侧。

use nalgebra::*;
use num_traits::One;
use parry3d::{bounding_volume::Aabb, math::Real};

/// 判断位置落在中心点的哪个子八叉槽位，恰好等于中心点的轴算作大的一侧
#[inline]
pub fn get_child(center: &Point3<Real>, point: &Point3<Real>) -> usize {
    let mut i: usize = 0;
    if point.x >= center.x {
        i |= 4;
    }
    if point.y >= center.y {
        i |= 2;
    }
    if point.z >= center.z {
        i |= 1;
    }
    i
}

/// 指定槽位计算子节点的中心点，沿每个轴偏移父节点边长的四分之一
pub fn create_child(center: &Point3<Real>, size: Real, index: usize) -> Point3<Real> {
    let two = Real::one() + Real::one();
    let offset = size / (two + two);
    macro_rules! c {
        ($c:ident, $bit:expr) => {
            if index & $bit == 0 {
                center.$c - offset
            } else {
                center.$c + offset
            }
        };
    }
    Point3::new(c!(x, 4), c!(y, 2), c!(z, 1))
}

/// 由中心点和边长生成包围盒
pub fn make_aabb(center: &Point3<Real>, size: Real) -> Aabb {
    let two = Real::one() + Real::one();
    let half = Vector3::new(size / two, size / two, size / two);
    Aabb::new(*center - half, *center + half)
}

#[test]
fn test_get_child() {
    let c = Point3::new(0.0, 0.0, 0.0);
    assert_eq!(get_child(&c, &Point3::new(-1.0, -1.0, -1.0)), 0);
    assert_eq!(get_child(&c, &Point3::new(-1.0, -1.0, 1.0)), 1);
    assert_eq!(get_child(&c, &Point3::new(-1.0, 1.0, -1.0)), 2);
    assert_eq!(get_child(&c, &Point3::new(-1.0, 1.0, 1.0)), 3);
    assert_eq!(get_child(&c, &Point3::new(1.0, -1.0, -1.0)), 4);
    assert_eq!(get_child(&c, &Point3::new(1.0, 1.0, 1.0)), 7);
    // 分界面上的位置算作大的一侧
    assert_eq!(get_child(&c, &c), 7);
    assert_eq!(get_child(&c, &Point3::new(0.0, -1.0, -1.0)), 4);
}

#[test]
fn test_create_child() {
    let c = Point3::new(0.0, 0.0, 0.0);
    assert_eq!(create_child(&c, 100.0, 0), Point3::new(-25.0, -25.0, -25.0));
    assert_eq!(create_child(&c, 100.0, 7), Point3::new(25.0, 25.0, 25.0));
    assert_eq!(create_child(&c, 100.0, 5), Point3::new(25.0, -25.0, 25.0));
    let p = create_child(&Point3::new(25.0, 25.0, 25.0), 50.0, 2);
    assert_eq!(p, Point3::new(12.5, 37.5, 12.5));
}

#[test]
fn test_make_aabb() {
    let aabb = make_aabb(&Point3::new(0.0, 0.0, 0.0), 100.0);
    // 两端都是闭区间
    assert!(aabb.contains_local_point(&Point3::new(50.0, 50.0, 50.0)));
    assert!(aabb.contains_local_point(&Point3::new(-50.0, 0.0, 50.0)));
    assert!(!aabb.contains_local_point(&Point3::new(50.5, 0.0, 0.0)));
}
