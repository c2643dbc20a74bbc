// ==========================================
// 连续流排产系统 - 工序与流水线领域模型
// ==========================================
// 职责: 定义工序（Sector）及其固定先后顺序（Pipeline）
// 红线: 流水线顺序由调用方注入，不使用模块级常量驱动排产
// ==========================================

use crate::domain::types::SectorKind;
use serde::{Deserialize, Serialize};

// ==========================================
// 生产配置中的工序名称
// ==========================================
pub mod sector_names {
    pub const PCP: &str = "PCP";
    pub const SEPARACAO_MP: &str = "Separação MP";
    pub const CORTE_MANUAL: &str = "Corte manual";
    pub const IMPRESSAO: &str = "Impressão";
    pub const ESTAMPA: &str = "Estampa";
    pub const CORTE_LASER: &str = "Corte laser";
    pub const COSTURA: &str = "Costura";
    pub const ARREMATE: &str = "Arremate";
    pub const EMBALAGEM: &str = "Embalagem";
}

// ==========================================
// Sector - 工序
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub name: String,     // 工序名称（全局唯一）
    pub position: usize,  // 在流水线中的位置（0 起）
    pub kind: SectorKind, // 裁剪路由使用的类别
    pub unlimited: bool,  // 是否不受日产能约束
}

impl Sector {
    /// 创建受产能约束的普通工序
    pub fn limited(name: &str) -> Self {
        Self {
            name: name.to_string(),
            position: 0,
            kind: SectorKind::Standard,
            unlimited: false,
        }
    }

    /// 创建不受产能约束的工序
    pub fn unlimited(name: &str) -> Self {
        Self {
            unlimited: true,
            ..Self::limited(name)
        }
    }

    /// 指定工序类别
    pub fn with_kind(mut self, kind: SectorKind) -> Self {
        self.kind = kind;
        self
    }

    /// 参数表中的最大产能键，例如 "Separação MP" → "MAX_SEPARACAO_MP"
    pub fn max_param_key(&self) -> String {
        format!("MAX_{}", fold_to_param_token(&self.name))
    }
}

/// 去掉重音并转成大写下划线形式
///
/// 参数表沿用纯 ASCII 键名，工序名里的葡语字符需要折叠
pub fn fold_to_param_token(name: &str) -> String {
    name.trim()
        .chars()
        .filter_map(|c| {
            let folded = match c {
                'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
                'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
                'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
                'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
                'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
                'ç' | 'Ç' => 'C',
                'ñ' | 'Ñ' => 'N',
                ' ' => '_',
                c if c.is_ascii() => c.to_ascii_uppercase(),
                _ => return None,
            };
            Some(folded)
        })
        .collect()
}

// ==========================================
// Pipeline - 工序流水线
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    sectors: Vec<Sector>,
}

impl Pipeline {
    /// 按给定顺序构造流水线，position 按下标重新编号
    pub fn new(sectors: Vec<Sector>) -> Self {
        let sectors = sectors
            .into_iter()
            .enumerate()
            .map(|(position, mut sector)| {
                sector.position = position;
                sector
            })
            .collect();
        Self { sectors }
    }

    /// 生产现场的九道工序
    ///
    /// PCP 与原料分拣按制度不设产能上限
    pub fn production() -> Self {
        use sector_names::*;

        Self::new(vec![
            Sector::unlimited(PCP),
            Sector::unlimited(SEPARACAO_MP),
            Sector::limited(CORTE_MANUAL).with_kind(SectorKind::ManualCut),
            Sector::limited(IMPRESSAO),
            Sector::limited(ESTAMPA),
            Sector::limited(CORTE_LASER).with_kind(SectorKind::LaserCut),
            Sector::limited(COSTURA),
            Sector::limited(ARREMATE),
            Sector::limited(EMBALAGEM),
        ])
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn first(&self) -> Option<&Sector> {
        self.sectors.first()
    }

    /// 按名称查找工序位置（忽略首尾空白与大小写）
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.sectors
            .iter()
            .position(|s| s.name.to_lowercase() == wanted)
    }

    pub fn get(&self, name: &str) -> Option<&Sector> {
        self.index_of(name).map(|idx| &self.sectors[idx])
    }

    /// 从指定位置开始的剩余工序
    pub fn from_index(&self, index: usize) -> &[Sector] {
        if index >= self.sectors.len() {
            return &[];
        }
        &self.sectors[index..]
    }
}
