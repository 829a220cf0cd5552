// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/category.rs - 垃圾桶类别与映射规则
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use serde::{Deserialize, Serialize};

/// 垃圾桶类别（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinCategory {
  /// 纸张与纸板
  Paper,
  /// 塑料包装（金属也归入此类）
  Plastic,
  /// 厨余
  Food,
  /// 混合垃圾，兜底类别
  Mixed,
  /// 回收站，仅远程服务会给出
  RecyclingCenter,
  /// 押金回收（易拉罐、PET 瓶），仅远程服务会给出
  Deposit,
}

impl BinCategory {
  pub const ALL: [BinCategory; 6] = [
    BinCategory::Paper,
    BinCategory::Plastic,
    BinCategory::Food,
    BinCategory::Mixed,
    BinCategory::RecyclingCenter,
    BinCategory::Deposit,
  ];

  /// 兜底类别
  pub const RESIDUAL: BinCategory = BinCategory::Mixed;

  /// 线上名称，与远程服务 JSON 一致
  pub fn as_str(&self) -> &'static str {
    match self {
      BinCategory::Paper => "paper",
      BinCategory::Plastic => "plastic",
      BinCategory::Food => "food",
      BinCategory::Mixed => "mixed",
      BinCategory::RecyclingCenter => "recycling_center",
      BinCategory::Deposit => "deposit",
    }
  }

  /// 冰岛语名称，用于播报
  pub fn name_is(&self) -> &'static str {
    match self {
      BinCategory::Paper => "Pappír og pappi",
      BinCategory::Plastic => "Plastumbúðir",
      BinCategory::Food => "Matarleifar",
      BinCategory::Mixed => "Blandaður úrgangur",
      BinCategory::RecyclingCenter => "Endurvinnslustöð",
      BinCategory::Deposit => "Skilagjald (Endurvinnslan)",
    }
  }

  pub fn from_wire(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|bin| bin.as_str() == name)
  }
}

impl std::fmt::Display for BinCategory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// TrashNet 标签到本地垃圾桶的基础映射
pub const TRASHNET_TO_BIN: &[(&str, BinCategory)] = &[
  ("cardboard", BinCategory::Paper),
  ("glass", BinCategory::Mixed),
  ("metal", BinCategory::Plastic),
  ("paper", BinCategory::Paper),
  ("plastic", BinCategory::Plastic),
  ("trash", BinCategory::Mixed),
];

/// 覆盖规则：(关键字, 类别)
pub type OverrideRule = (&'static str, BinCategory);

/// 冰岛（SORPA）地区覆盖规则，按顺序匹配，命中第一条即停止
///
/// 3D 打印件、生物塑料与泡沫材料当地回收线无法处理，一律进入混合垃圾。
/// 裸关键字 "pla" 会吞掉 "plastic"，因此不在表中。
pub const ICELAND_OVERRIDES: &[OverrideRule] = &[
  ("3d_print", BinCategory::Mixed),
  ("3d", BinCategory::Mixed),
  ("petg", BinCategory::Mixed),
  ("abs", BinCategory::Mixed),
  ("bioplastic", BinCategory::Mixed),
  ("styrofoam", BinCategory::Mixed),
  ("foam", BinCategory::Mixed),
];

/// 将模型原始标签映射为垃圾桶类别
pub fn map_label(raw_label: Option<&str>) -> BinCategory {
  map_label_with(raw_label, TRASHNET_TO_BIN, ICELAND_OVERRIDES)
}

/// 使用指定映射表与覆盖规则进行映射
pub fn map_label_with(
  raw_label: Option<&str>,
  table: &[(&str, BinCategory)],
  overrides: &[OverrideRule],
) -> BinCategory {
  let label = match raw_label {
    Some(label) if !label.is_empty() => label.to_lowercase(),
    _ => return BinCategory::RESIDUAL,
  };

  let base = table
    .iter()
    .find(|(name, _)| *name == label)
    .map(|(_, bin)| *bin)
    .unwrap_or(BinCategory::RESIDUAL);

  overrides
    .iter()
    .find(|(keyword, _)| label.contains(&keyword.to_lowercase()))
    .map(|(_, bin)| *bin)
    .unwrap_or(base)
}
