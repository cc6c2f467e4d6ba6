use super::keypoint::{Keypoint, PartName, Pose};

/// 部位名で引けるキーポイント集合
///
/// モデル出力の順序付きリストを部位名ルックアップに正規化する。
/// 純粋な変換で、スコアによるフィルタリングは行わない
/// （スコア判定は描画・配置側の責務）。
#[derive(Debug, Clone)]
pub struct NamedKeypoints {
    slots: [Option<Keypoint>; PartName::COUNT],
}

impl NamedKeypoints {
    pub fn from_pose(pose: &Pose) -> Self {
        let mut slots = [None; PartName::COUNT];
        for kp in &pose.keypoints {
            slots[kp.part as usize] = Some(*kp);
        }
        Self { slots }
    }

    pub fn get(&self, part: PartName) -> Option<&Keypoint> {
        self.slots[part as usize].as_ref()
    }

    /// 指定した部位がすべて存在すれば同じ順序で返す。
    /// 一つでも欠けていれば None（部分的な結果は返さない）。
    /// モデルは全部位を返す契約なので、欠損は防御的な扱い。
    pub fn require<const N: usize>(&self, parts: [PartName; N]) -> Option<[Keypoint; N]> {
        let mut out = [Keypoint::new(PartName::Nose, 0.0, 0.0, 0.0); N];
        for (slot, part) in out.iter_mut().zip(parts) {
            *slot = *self.get(part)?;
        }
        Some(out)
    }
}
