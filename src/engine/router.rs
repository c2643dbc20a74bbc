// ==========================================
// 连续流排产系统 - 裁剪方式路由
// ==========================================
// 规则: 激光裁剪工单跳过手工裁剪工序，手工裁剪工单跳过激光裁剪工序
// 红线: 其余工序原样保留，顺序不变
// ==========================================

use crate::domain::{CutType, Sector, SectorKind};

pub struct CutTypeRouter;

impl CutTypeRouter {
    pub fn route(sectors: &[Sector], cut_type: CutType) -> Vec<Sector> {
        sectors
            .iter()
            .filter(|s| !Self::excludes(s.kind, cut_type))
            .cloned()
            .collect()
    }

    /// 该类别工序是否被裁剪方式排除
    pub fn excludes(kind: SectorKind, cut_type: CutType) -> bool {
        matches!(
            (kind, cut_type),
            (SectorKind::ManualCut, CutType::Laser) | (SectorKind::LaserCut, CutType::Manual)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{sector_names, Pipeline};

    fn names(route: &[Sector]) -> Vec<&str> {
        route.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_laser_drops_manual_cut() {
        let pipeline = Pipeline::production();
        let route = CutTypeRouter::route(pipeline.sectors(), CutType::Laser);

        assert_eq!(route.len(), 8);
        assert!(!names(&route).contains(&sector_names::CORTE_MANUAL));
        assert!(names(&route).contains(&sector_names::CORTE_LASER));
    }

    #[test]
    fn test_manual_from_mid_pipeline() {
        let pipeline = Pipeline::production();
        let idx = pipeline.index_of("Estampa").unwrap();
        let route = CutTypeRouter::route(pipeline.from_index(idx), CutType::Manual);

        assert_eq!(names(&route), vec!["Estampa", "Costura", "Arremate", "Embalagem"]);
    }
}
