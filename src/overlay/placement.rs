use serde::Deserialize;

use super::anchors::{AnchorGeometry, Point};
use super::asset::OverlayAsset;
use crate::pose::{NamedKeypoints, PartName};

/// オーバーレイの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Hat,
    Mask,
    Shirt,
}

/// 1オーバーレイ・1フレーム分の描画指示
///
/// 回転はピボット（首）を中心に適用する。矩形中心ではなく
/// 首を軸にすることで、頭が傾いても帽子が頭に追従して見える。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// 回転角（度）。0 なら軸平行に描画
    pub rotation_deg: f32,
    /// 回転の中心
    pub pivot: Point,
}

/// オーバーレイごとの固定チューニング係数
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct OverlayTuning {
    /// 帽子が耳からどれだけ横にはみ出すか
    #[serde(default = "default_hat_x_factor")]
    pub hat_x_factor: f32,
    /// 帽子の下端を目線からどれだけ持ち上げるか（鼻-目距離比）
    #[serde(default = "default_hat_y_factor")]
    pub hat_y_factor: f32,
    #[serde(default = "default_mask_x_factor")]
    pub mask_x_factor: f32,
    #[serde(default = "default_mask_y_factor")]
    pub mask_y_factor: f32,
}

fn default_hat_x_factor() -> f32 { 1.5 }
fn default_hat_y_factor() -> f32 { 0.75 }
fn default_mask_x_factor() -> f32 { 0.5 }
fn default_mask_y_factor() -> f32 { 0.5 }

impl Default for OverlayTuning {
    fn default() -> Self {
        Self {
            hat_x_factor: default_hat_x_factor(),
            hat_y_factor: default_hat_y_factor(),
            mask_x_factor: default_mask_x_factor(),
            mask_y_factor: default_mask_y_factor(),
        }
    }
}

/// 1フレーム分の全オーバーレイ配置
#[derive(Debug, Clone, Copy)]
pub struct OverlayPlacements {
    pub hat: Option<PlacementRect>,
    pub mask: Option<PlacementRect>,
    pub shirt: Option<PlacementRect>,
}

impl OverlayPlacements {
    /// すべてスキップ（このフレームはオーバーレイを描かない）
    pub fn skip_all() -> Self {
        Self {
            hat: None,
            mask: None,
            shirt: None,
        }
    }
}

/// 1オーバーレイ分の配置を解決する。
/// 必要なキーポイントが欠けていれば None（スキップ）。
/// 部分的な座標や NaN を返すことはない。
pub fn place_overlay(
    kind: OverlayKind,
    named: &NamedKeypoints,
    anchors: &AnchorGeometry,
    asset: &OverlayAsset,
    tuning: &OverlayTuning,
) -> Option<PlacementRect> {
    match kind {
        OverlayKind::Hat => place_hat(named, anchors, asset, tuning),
        OverlayKind::Mask => place_mask(named, asset, tuning),
        // 胴体アンカリングは未実装の予約スロット
        OverlayKind::Shirt => None,
    }
}

/// アンカー計算と3種のオーバーレイ解決をまとめて行う。
/// アンカーが不完全なフレームは全オーバーレイをスキップする。
pub fn resolve_placements(
    named: &NamedKeypoints,
    hat: &OverlayAsset,
    mask: &OverlayAsset,
    shirt: &OverlayAsset,
    tuning: &OverlayTuning,
) -> OverlayPlacements {
    let anchors = match AnchorGeometry::compute(named) {
        Some(anchors) => anchors,
        None => return OverlayPlacements::skip_all(),
    };

    OverlayPlacements {
        hat: place_overlay(OverlayKind::Hat, named, &anchors, hat, tuning),
        mask: place_overlay(OverlayKind::Mask, named, &anchors, mask, tuning),
        shirt: place_overlay(OverlayKind::Shirt, named, &anchors, shirt, tuning),
    }
}

/// 帽子: 耳の外側にはみ出した横幅、目線より上に下端、首を軸に頭部ロールへ追従
fn place_hat(
    named: &NamedKeypoints,
    anchors: &AnchorGeometry,
    asset: &OverlayAsset,
    tuning: &OverlayTuning,
) -> Option<PlacementRect> {
    let [left_ear, right_ear, right_eye, nose] = named.require([
        PartName::LeftEar,
        PartName::RightEar,
        PartName::RightEye,
        PartName::Nose,
    ])?;

    let margin = (right_eye.x - right_ear.x) * tuning.hat_x_factor;
    let x = right_ear.x - margin;
    let width = left_ear.x - x + margin;
    let height = width * asset.aspect;
    let y = right_eye.y - (tuning.hat_y_factor * (nose.y - right_eye.y) + height);

    Some(PlacementRect {
        x,
        y,
        width,
        height,
        rotation_deg: anchors.rotation_deg,
        pivot: anchors.neck,
    })
}

/// マスク: 鼻を下端基準に配置。帽子と違い回転させず軸平行のまま描く
fn place_mask(
    named: &NamedKeypoints,
    asset: &OverlayAsset,
    tuning: &OverlayTuning,
) -> Option<PlacementRect> {
    let [left_ear, right_ear, right_eye, nose] = named.require([
        PartName::LeftEar,
        PartName::RightEar,
        PartName::RightEye,
        PartName::Nose,
    ])?;

    let x_adjustment = (right_eye.x - right_ear.x) * tuning.mask_x_factor;
    let y_adjustment = (right_eye.y - right_ear.y) * tuning.mask_y_factor;
    let x = right_ear.x - x_adjustment;
    let width = left_ear.x - x + x_adjustment;
    let height = width * asset.aspect;
    let y = nose.y - (height + y_adjustment);

    Some(PlacementRect {
        x,
        y,
        width,
        height,
        rotation_deg: 0.0,
        pivot: Point::new(x + width / 2.0, y + height / 2.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, Pose};

    fn named_from(points: &[(PartName, f32, f32)]) -> NamedKeypoints {
        let keypoints = points
            .iter()
            .map(|&(part, x, y)| Keypoint::new(part, x, y, 1.0))
            .collect();
        NamedKeypoints::from_pose(&Pose::new(1.0, keypoints))
    }

    fn reference_points() -> Vec<(PartName, f32, f32)> {
        vec![
            (PartName::LeftEye, 100.0, 50.0),
            (PartName::RightEye, 60.0, 50.0),
            (PartName::Nose, 80.0, 70.0),
            (PartName::LeftEar, 115.0, 55.0),
            (PartName::RightEar, 45.0, 55.0),
            (PartName::LeftShoulder, 110.0, 120.0),
            (PartName::RightShoulder, 50.0, 120.0),
        ]
    }

    fn test_asset(aspect: f32) -> OverlayAsset {
        OverlayAsset::checker(40, (40.0 * aspect) as u32, 0xFF00FF00, 0xFF0000FF)
    }

    #[test]
    fn test_hat_reference_scenario() {
        let named = named_from(&reference_points());
        let anchors = AnchorGeometry::compute(&named).unwrap();
        let asset = test_asset(0.75);
        let rect = place_overlay(
            OverlayKind::Hat,
            &named,
            &anchors,
            &asset,
            &OverlayTuning::default(),
        )
        .unwrap();

        // margin = (60 - 45) * 1.5 = 22.5
        assert_eq!(rect.x, 22.5);
        assert_eq!(rect.width, 115.0);
        assert_eq!(rect.height, 115.0 * asset.aspect);
        // y = 50 - (0.75 * 20 + height)
        assert_eq!(rect.y, 50.0 - (15.0 + rect.height));
        assert_eq!(rect.rotation_deg, 0.0);
        assert_eq!(rect.pivot, Point::new(80.0, 95.0));
    }

    #[test]
    fn test_mask_reference_scenario() {
        let named = named_from(&reference_points());
        let anchors = AnchorGeometry::compute(&named).unwrap();
        let asset = test_asset(0.6);
        let rect = place_overlay(
            OverlayKind::Mask,
            &named,
            &anchors,
            &asset,
            &OverlayTuning::default(),
        )
        .unwrap();

        // x_adjustment = 7.5, y_adjustment = (50 - 55) * 0.5 = -2.5
        assert_eq!(rect.x, 37.5);
        assert_eq!(rect.width, 85.0);
        assert_eq!(rect.y, 70.0 - (rect.height - 2.5));
        // マスクは軸平行のまま
        assert_eq!(rect.rotation_deg, 0.0);
    }

    #[test]
    fn test_shirt_is_reserved_slot() {
        let named = named_from(&reference_points());
        let anchors = AnchorGeometry::compute(&named).unwrap();
        let asset = test_asset(1.0);
        assert!(place_overlay(
            OverlayKind::Shirt,
            &named,
            &anchors,
            &asset,
            &OverlayTuning::default()
        )
        .is_none());
    }

    #[test]
    fn test_width_scales_linearly_with_ear_span() {
        let asset = test_asset(0.75);
        let tuning = OverlayTuning::default();

        let named = named_from(&reference_points());
        let anchors = AnchorGeometry::compute(&named).unwrap();
        let base = place_overlay(OverlayKind::Hat, &named, &anchors, &asset, &tuning).unwrap();

        // X座標を一律2倍 → 耳間・目間距離が2倍
        let doubled: Vec<_> = reference_points()
            .iter()
            .map(|&(p, x, y)| (p, x * 2.0, y))
            .collect();
        let named2 = named_from(&doubled);
        let anchors2 = AnchorGeometry::compute(&named2).unwrap();
        let wide = place_overlay(OverlayKind::Hat, &named2, &anchors2, &asset, &tuning).unwrap();

        assert_eq!(wide.width, base.width * 2.0);
        assert_eq!(wide.height, base.height * 2.0);

        let mask_base = place_overlay(OverlayKind::Mask, &named, &anchors, &asset, &tuning).unwrap();
        let mask_wide =
            place_overlay(OverlayKind::Mask, &named2, &anchors2, &asset, &tuning).unwrap();
        assert_eq!(mask_wide.width, mask_base.width * 2.0);
    }

    #[test]
    fn test_missing_part_skips_hat_and_mask() {
        for skip in [
            PartName::LeftEye,
            PartName::RightEye,
            PartName::Nose,
            PartName::LeftEar,
            PartName::RightEar,
            PartName::LeftShoulder,
            PartName::RightShoulder,
        ] {
            let points: Vec<_> = reference_points()
                .into_iter()
                .filter(|&(p, _, _)| p != skip)
                .collect();
            let named = named_from(&points);
            let asset = test_asset(0.75);
            let placements =
                resolve_placements(&named, &asset, &asset, &asset, &OverlayTuning::default());
            assert!(placements.hat.is_none(), "{:?} 欠損で帽子はスキップ", skip);
            assert!(placements.mask.is_none(), "{:?} 欠損でマスクはスキップ", skip);
            assert!(placements.shirt.is_none());
        }
    }

    #[test]
    fn test_resolve_full_set() {
        let named = named_from(&reference_points());
        let asset = test_asset(0.75);
        let placements =
            resolve_placements(&named, &asset, &asset, &asset, &OverlayTuning::default());
        assert!(placements.hat.is_some());
        assert!(placements.mask.is_some());
        assert!(placements.shirt.is_none());
    }

    #[test]
    fn test_idempotent() {
        let named = named_from(&reference_points());
        let anchors = AnchorGeometry::compute(&named).unwrap();
        let asset = test_asset(0.75);
        let tuning = OverlayTuning::default();
        let a = place_overlay(OverlayKind::Hat, &named, &anchors, &asset, &tuning).unwrap();
        let b = place_overlay(OverlayKind::Hat, &named, &anchors, &asset, &tuning).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tilted_head_rotates_hat_only() {
        let mut points = reference_points();
        points[0] = (PartName::LeftEye, 100.0, 58.0);
        let named = named_from(&points);
        let anchors = AnchorGeometry::compute(&named).unwrap();
        let asset = test_asset(0.75);
        let tuning = OverlayTuning::default();

        let hat = place_overlay(OverlayKind::Hat, &named, &anchors, &asset, &tuning).unwrap();
        let mask = place_overlay(OverlayKind::Mask, &named, &anchors, &asset, &tuning).unwrap();
        assert!(hat.rotation_deg > 0.0);
        assert_eq!(mask.rotation_deg, 0.0);
    }
}
