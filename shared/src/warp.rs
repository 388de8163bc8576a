//! Four-corner keystone quad in wall pixels.

use serde::{Deserialize, Serialize};

use crate::geometry::{bilinear, px_to_world};
use crate::{Point, WALL_HEIGHT, WALL_WIDTH};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Tl,
    Tr,
    Br,
    Bl,
}

impl Corner {
    /// Declaration order. Hit-testing walks corners in this order.
    pub const ALL: [Corner; 4] = [Corner::Tl, Corner::Tr, Corner::Br, Corner::Bl];

    pub fn label(self) -> &'static str {
        match self {
            Corner::Tl => "TL",
            Corner::Tr => "TR",
            Corner::Br => "BR",
            Corner::Bl => "BL",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct WarpQuad {
    pub tl: Point,
    pub tr: Point,
    pub br: Point,
    pub bl: Point,
}

impl Default for WarpQuad {
    fn default() -> Self {
        Self::full_wall()
    }
}

impl WarpQuad {
    /// The unwarped quad covering the whole wall.
    pub fn full_wall() -> Self {
        Self {
            tl: Point::new(0.0, 0.0),
            tr: Point::new(WALL_WIDTH, 0.0),
            br: Point::new(WALL_WIDTH, WALL_HEIGHT),
            bl: Point::new(0.0, WALL_HEIGHT),
        }
    }

    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::Tl => self.tl,
            Corner::Tr => self.tr,
            Corner::Br => self.br,
            Corner::Bl => self.bl,
        }
    }

    /// Moves one corner, clamped into the wall. The other three are untouched.
    pub fn with_corner(mut self, corner: Corner, point: Point) -> Self {
        let point = point.clamp_to_wall();
        match corner {
            Corner::Tl => self.tl = point,
            Corner::Tr => self.tr = point,
            Corner::Br => self.br = point,
            Corner::Bl => self.bl = point,
        }
        self
    }

    /// Corners in `tl, tr, br, bl` order.
    pub fn corners(&self) -> [Point; 4] {
        [self.tl, self.tr, self.br, self.bl]
    }

    /// Same quad in preview world units.
    pub fn to_world(&self) -> Self {
        Self {
            tl: px_to_world(self.tl),
            tr: px_to_world(self.tr),
            br: px_to_world(self.br),
            bl: px_to_world(self.bl),
        }
    }

    pub fn sample(&self, u: f64, v: f64) -> Point {
        bilinear(u, v, self.tl, self.tr, self.br, self.bl)
    }
}
