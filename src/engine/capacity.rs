// ==========================================
// 连续流排产系统 - 工序产能模型
// ==========================================
// 职责: 解析每道工序的日产能上限与换型下限
// 规则:
//   上限 = floor(基础最大产能 × 负荷系数 / 100)，每批写入上限区一次
//   换型下限 = 上限 × 换型百分比 / 100，不限产能工序忽略
// ==========================================

use crate::config::{default_sector_max, PlanningParameters};
use crate::domain::{Ceiling, Pipeline, Sector};
use crate::engine::ports::SectorLimitStore;
use crate::repository::error::RepositoryResult;
use std::collections::HashMap;

// ==========================================
// SectorCapacity - 单工序产能
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorCapacity {
    pub ceiling: Ceiling,
    pub setup_min: f64,
}

impl SectorCapacity {
    pub fn unlimited() -> Self {
        Self {
            ceiling: Ceiling::Unlimited,
            setup_min: 0.0,
        }
    }

    pub fn limited(ceiling: i64, setup_percent: f64) -> Self {
        Self {
            ceiling: Ceiling::Limited(ceiling),
            setup_min: ceiling as f64 * setup_percent / 100.0,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.ceiling.is_unlimited()
    }

    /// 余量是否低于换型下限（0 余量不算）
    pub fn below_setup(&self, headroom: i64) -> bool {
        !self.is_unlimited() && headroom > 0 && (headroom as f64) < self.setup_min
    }
}

/// 负荷系数调整后的上限
pub fn adjusted_ceiling(base_max: f64, load_factor_percent: f64) -> i64 {
    let value = (base_max * load_factor_percent / 100.0).floor();
    if value.is_finite() && value > 0.0 {
        value as i64
    } else {
        0
    }
}

// ==========================================
// SectorCapacityModel - 产能模型
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SectorCapacityModel {
    capacities: HashMap<String, SectorCapacity>,
    setup_percent: f64,
    load_factor_percent: f64,
}

impl SectorCapacityModel {
    /// 批量排产开始时调用: 写入调整后的上限，再回读一次形成快照
    pub fn prepare<L>(
        pipeline: &Pipeline,
        params: &PlanningParameters,
        limits: &L,
    ) -> RepositoryResult<Self>
    where
        L: SectorLimitStore + ?Sized,
    {
        for sector in pipeline.sectors() {
            let ceiling = if sector.unlimited {
                Ceiling::Unlimited
            } else {
                Ceiling::Limited(adjusted_ceiling(
                    params.base_max(sector),
                    params.load_factor_percent,
                ))
            };
            limits.write_limit(&sector.name, ceiling)?;
        }

        let mut model = Self {
            capacities: HashMap::new(),
            setup_percent: params.setup_percent,
            load_factor_percent: params.load_factor_percent,
        };

        for sector in pipeline.sectors() {
            let capacity = match limits.read_limit(&sector.name)? {
                Some(Ceiling::Limited(limit)) if !sector.unlimited => {
                    SectorCapacity::limited(limit, params.setup_percent)
                }
                Some(_) if sector.unlimited => SectorCapacity::unlimited(),
                _ => model.fallback(sector),
            };
            tracing::debug!(
                sector = %sector.name,
                ceiling = %capacity.ceiling,
                setup_min = capacity.setup_min,
                "工序产能已就绪"
            );
            model.capacities.insert(sector.name.clone(), capacity);
        }

        Ok(model)
    }

    /// 直接指定各工序产能（合成流水线）
    pub fn from_capacities<I>(capacities: I) -> Self
    where
        I: IntoIterator<Item = (String, SectorCapacity)>,
    {
        Self {
            capacities: capacities.into_iter().collect(),
            setup_percent: crate::config::planning_config::defaults::SETUP_PERCENT,
            load_factor_percent: crate::config::planning_config::defaults::LOAD_FACTOR_PERCENT,
        }
    }

    pub fn capacity_of(&self, sector: &Sector) -> SectorCapacity {
        match self.capacities.get(&sector.name) {
            Some(capacity) => *capacity,
            None => self.fallback(sector),
        }
    }

    fn fallback(&self, sector: &Sector) -> SectorCapacity {
        if sector.unlimited {
            return SectorCapacity::unlimited();
        }
        let ceiling = adjusted_ceiling(default_sector_max(&sector.name), self.load_factor_percent);
        tracing::warn!(sector = %sector.name, ceiling, "工序上限缺失，使用默认上限");
        SectorCapacity::limited(ceiling, self.setup_percent)
    }
}
