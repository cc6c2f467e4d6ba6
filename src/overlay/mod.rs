pub mod anchors;
pub mod asset;
pub mod placement;

pub use anchors::{AnchorGeometry, Point};
pub use asset::{CostumeSet, OverlayAsset};
pub use placement::{
    place_overlay, resolve_placements, OverlayKind, OverlayPlacements, OverlayTuning,
    PlacementRect,
};
