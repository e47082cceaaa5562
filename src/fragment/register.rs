use super::FragmentContext;
use crate::{
    engine::{OdometryOption, OdometryResult},
    error::Error,
    transform::Transform,
};

/// Registers frame `s` against frame `t`.
///
/// Adjacent frames go straight to the RGBD odometry from the identity. The
/// caller uses that result whatever its success flag says. Other pairs are
/// loop closure candidates: they need a coarse estimate from the pose
/// estimator to seed the odometry, and fail with identity transform and
/// information when there is no estimator or it finds nothing.
pub fn register_rgbd_pair(
    ctx: &FragmentContext,
    s: usize,
    t: usize,
) -> Result<OdometryResult, Error> {
    let option = OdometryOption::from_config(ctx.config);

    if s.abs_diff(t) == 1 {
        let source = ctx.dataset.get(s)?;
        let target = ctx.dataset.get(t)?;
        return ctx.engine.compute_rgbd_odometry(
            &source,
            &target,
            &ctx.intrinsic,
            &Transform::eye(),
            &option,
        );
    }

    let estimator = match ctx.pose_estimator {
        Some(estimator) => estimator,
        None => return Ok(OdometryResult::failure()),
    };

    let source = ctx.dataset.get(s)?;
    let target = ctx.dataset.get(t)?;
    match estimator.estimate(&source, &target, &ctx.intrinsic) {
        Some(init) => {
            ctx.engine
                .compute_rgbd_odometry(&source, &target, &ctx.intrinsic, &init, &option)
        }
        None => {
            log::debug!("No coarse pose between frames {s} and {t}");
            Ok(OdometryResult::failure())
        }
    }
}
