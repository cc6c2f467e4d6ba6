use anyhow::{Context, Result};
use std::fs;

use kisekae_overlay::overlay::{
    resolve_placements, AnchorGeometry, OverlayAsset, OverlayTuning, PlacementRect,
};
use kisekae_overlay::pose::{NamedKeypoints, Pose};

/// JSONのポーズ1件から配置計算だけを実行して表示するデバッグツール
///
/// 入力形式 (PoseNet互換):
/// {"score": 0.9, "keypoints": [{"part": "nose", "x": 80, "y": 70, "score": 1.0}, ...]}
fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .context("使い方: placement_probe <pose.json> [hat_aspect] [mask_aspect]")?;
    let hat_aspect: f32 = std::env::args()
        .nth(2)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(0.75);
    let mask_aspect: f32 = std::env::args()
        .nth(3)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(0.6);

    let content = fs::read_to_string(&path).with_context(|| format!("読み込み失敗: {}", path))?;
    let pose: Pose = serde_json::from_str(&content).context("ポーズJSONの解析に失敗")?;

    println!("pose score: {:.3} ({} keypoints)", pose.score, pose.keypoints.len());

    let named = NamedKeypoints::from_pose(&pose);
    match AnchorGeometry::compute(&named) {
        Some(anchors) => {
            println!("rotation : {:+.2} deg", anchors.rotation_deg);
            println!("neck     : ({:.1}, {:.1})", anchors.neck.x, anchors.neck.y);
            println!("ear span : {:.1}", anchors.ear_span);
            println!("eye span : {:.1}", anchors.eye_span);
        }
        None => {
            println!("アンカー計算に必要なキーポイントが欠けている");
            return Ok(());
        }
    }

    let hat = OverlayAsset::checker(100, (100.0 * hat_aspect) as u32, 0xFFFFFFFF, 0xFF000000);
    let mask = OverlayAsset::checker(100, (100.0 * mask_aspect) as u32, 0xFFFFFFFF, 0xFF000000);
    let shirt = OverlayAsset::checker(100, 100, 0xFFFFFFFF, 0xFF000000);

    let placements = resolve_placements(&named, &hat, &mask, &shirt, &OverlayTuning::default());
    print_placement("hat", &placements.hat);
    print_placement("mask", &placements.mask);
    print_placement("shirt", &placements.shirt);

    Ok(())
}

fn print_placement(label: &str, rect: &Option<PlacementRect>) {
    match rect {
        Some(r) => println!(
            "{:5}: x={:.1} y={:.1} w={:.1} h={:.1} rot={:+.2} deg pivot=({:.1}, {:.1})",
            label, r.x, r.y, r.width, r.height, r.rotation_deg, r.pivot.x, r.pivot.y
        ),
        None => println!("{:5}: skip", label),
    }
}
