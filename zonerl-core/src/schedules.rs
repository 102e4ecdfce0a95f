/// Linearly anneals epsilon from `start_e` to `end_e` over `duration` steps,
/// clamped at `end_e` afterwards.
pub fn linear_schedule(start_e: f32, end_e: f32, duration: f32, t: usize) -> f32 {
    let slope = (end_e - start_e) / duration;
    (slope * t as f32 + start_e).max(end_e)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn monotone_non_increasing() {
        let mut previous = f32::INFINITY;
        for t in 0..1000 {
            let eps = linear_schedule(1.0, 0.01, 500., t);
            assert!(eps <= previous);
            previous = eps;
        }
    }

    #[test]
    fn reaches_floor_and_stays_there() {
        let duration = 500.;
        let end_e = 0.01;
        assert_eq!(linear_schedule(1.0, end_e, duration, 500), end_e);
        for t in 500..2000 {
            assert_eq!(linear_schedule(1.0, end_e, duration, t), end_e);
        }
        // still above the floor just before the end of the fraction
        assert!(linear_schedule(1.0, end_e, duration, 250) > end_e);
    }
}
