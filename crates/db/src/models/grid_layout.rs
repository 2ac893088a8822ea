use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A rectangular placement of one fidget on the tab grid, in grid units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GridItem {
    /// Id of the fidget instance this cell hosts
    pub i: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<i32>,
    /// Drag-lock hint for the editor. Not consulted by layout repair.
    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved: Option<bool>,
}

impl GridItem {
    pub fn new(i: impl Into<String>, x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            i: i.into(),
            x,
            y,
            w,
            h,
            min_w: None,
            max_w: None,
            min_h: None,
            max_h: None,
            is_static: None,
            moved: None,
        }
    }

    /// Exclusive right edge. Widened so client coordinates near `i32::MAX`
    /// cannot overflow.
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.w)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.h)
    }

    /// True when both spans intersect. Shared edges do not count.
    pub fn overlaps(&self, other: &GridItem) -> bool {
        i64::from(self.x) < other.right()
            && self.right() > i64::from(other.x)
            && i64::from(self.y) < other.bottom()
            && self.bottom() > i64::from(other.y)
    }

    pub fn fits_within(&self, cols: i32, rows: i32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= i64::from(cols)
            && self.bottom() <= i64::from(rows)
    }

    pub fn same_placement(&self, other: &GridItem) -> bool {
        self.x == other.x && self.y == other.y && self.w == other.w && self.h == other.h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = GridItem::new("a", 0, 0, 4, 4);
        assert!(!a.overlaps(&GridItem::new("b", 4, 0, 2, 2)));
        assert!(!a.overlaps(&GridItem::new("c", 0, 4, 2, 2)));
        assert!(a.overlaps(&GridItem::new("d", 3, 3, 2, 2)));
    }

    #[test]
    fn test_fits_within() {
        assert!(GridItem::new("a", 8, 6, 4, 4).fits_within(12, 10));
        assert!(!GridItem::new("a", 9, 0, 4, 1).fits_within(12, 10));
        assert!(!GridItem::new("a", -1, 0, 1, 1).fits_within(12, 10));
    }

    #[test]
    fn test_far_coordinates_do_not_wrap() {
        let far_x = GridItem::new("a", i32::MAX, 0, 2, 2);
        let far_y = GridItem::new("b", 0, i32::MAX, 2, 2);
        assert_eq!(far_x.right(), i64::from(i32::MAX) + 2);
        assert!(!far_x.fits_within(12, 10));
        assert!(!far_y.fits_within(12, 10));
        assert!(!far_x.overlaps(&GridItem::new("c", 0, 0, 4, 4)));
        assert!(far_x.overlaps(&GridItem::new("d", i32::MAX - 1, 1, 1, 1)));
        assert!(!GridItem::new("e", i32::MIN, i32::MIN, i32::MAX, i32::MAX).fits_within(12, 10));
    }

    #[test]
    fn test_wire_field_names() {
        let mut item = GridItem::new("text:1", 1, 2, 3, 4);
        item.is_static = Some(true);
        item.min_w = Some(2);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["static"], true);
        assert_eq!(value["minW"], 2);
        assert!(value.get("moved").is_none());
    }
}
