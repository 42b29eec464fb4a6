use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::models::Problem;

/// Hue is a fraction of a full turn; negative hues wrap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

const COLD: Hsv = Hsv {
    h: -2.0 / 360.0,
    s: 0.96,
    v: 0.31,
};
const WARM: Hsv = Hsv {
    h: 105.0 / 360.0,
    s: 0.96,
    v: 0.31,
};
const ODD_SATURATION_DROP: f64 = 0.15;
const ODD_VALUE_BOOST: f64 = 0.1;

const BALLOON_IMAGE_DIR: &str = "assets/balloons";

pub fn hsv_to_rgb(hsv: Hsv) -> Rgb {
    let h = hsv.h.rem_euclid(1.0);
    let s = hsv.s.clamp(0.0, 1.0);
    let v = hsv.v.clamp(0.0, 1.0);

    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match sector as u8 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Rgb {
        r: channel(r),
        g: channel(g),
        b: channel(b),
    }
}

fn channel(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Badge color for the bucket of teams that solved `index` problems.
///
/// `index` ranges over `0..=problem_count`; the last stop is the
/// "solved everything" bucket. Odd stops are lightened so neighbouring
/// buckets stay distinguishable.
pub fn color_for_index(index: usize, problem_count: NonZeroUsize) -> Rgb {
    let ratio = index as f64 / problem_count.get() as f64;
    let lerp = |from: f64, to: f64| from * (1.0 - ratio) + to * ratio;

    let mut hsv = Hsv {
        h: lerp(COLD.h, WARM.h),
        s: lerp(COLD.s, WARM.s),
        v: lerp(COLD.v, WARM.v),
    };
    if index % 2 == 1 {
        hsv.s = (hsv.s - ODD_SATURATION_DROP).max(0.0);
        hsv.v = (hsv.v + ODD_VALUE_BOOST).min(1.0);
    }

    hsv_to_rgb(hsv)
}

pub fn solved_count_palette(problem_count: NonZeroUsize) -> Vec<Rgb> {
    (0..=problem_count.get())
        .map(|index| color_for_index(index, problem_count))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProblemBadge {
    pub problem_id: String,
    pub label: String,
    pub balloon_image: Option<PathBuf>,
}

/// Per-problem indicator label and balloon image, independent of the gradient.
pub fn problem_badges(problems: &[Problem]) -> Vec<ProblemBadge> {
    problems
        .iter()
        .map(|problem| ProblemBadge {
            problem_id: problem.id.clone(),
            label: problem.name.clone(),
            balloon_image: problem
                .color
                .as_deref()
                .filter(|color| !color.is_empty())
                .map(|color| PathBuf::from(BALLOON_IMAGE_DIR).join(format!("{color}.png"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn primary_hues_convert() {
        let red = hsv_to_rgb(Hsv {
            h: 0.0,
            s: 1.0,
            v: 1.0,
        });
        assert_eq!(red, Rgb { r: 255, g: 0, b: 0 });

        let green = hsv_to_rgb(Hsv {
            h: 1.0 / 3.0,
            s: 1.0,
            v: 1.0,
        });
        assert_eq!(green, Rgb { r: 0, g: 255, b: 0 });

        let grey = hsv_to_rgb(Hsv {
            h: 0.7,
            s: 0.0,
            v: 0.5,
        });
        assert_eq!(grey, Rgb { r: 128, g: 128, b: 128 });
    }

    #[test]
    fn negative_hue_wraps_to_red_side() {
        let cold = color_for_index(0, count(10));
        assert_eq!(cold, hsv_to_rgb(COLD));
        assert!(cold.r > cold.g && cold.r > cold.b);
        assert_eq!(cold.r, 79);
    }

    #[test]
    fn last_stop_is_the_warm_endpoint() {
        // 10 is even, so no parity adjustment applies.
        let warm = color_for_index(10, count(10));
        assert_eq!(warm, hsv_to_rgb(WARM));
        assert!(warm.g > warm.r);
    }

    #[test]
    fn deterministic_output() {
        for i in 0..=12 {
            assert_eq!(color_for_index(i, count(12)), color_for_index(i, count(12)));
        }
    }

    #[test]
    fn odd_stops_are_lightened() {
        let n = count(9);
        for i in 0..9 {
            assert_ne!(color_for_index(i, n), color_for_index(i + 1, n));
        }

        let odd = color_for_index(1, count(1));
        let plain = hsv_to_rgb(Hsv {
            h: WARM.h,
            s: WARM.s - ODD_SATURATION_DROP,
            v: WARM.v + ODD_VALUE_BOOST,
        });
        assert_eq!(odd, plain);
    }

    #[test]
    fn palette_has_one_stop_per_bucket() {
        let palette = solved_count_palette(count(10));
        assert_eq!(palette.len(), 11);
        assert_eq!(palette[3], color_for_index(3, count(10)));
    }

    #[test]
    fn color_formats() {
        let rgb = Rgb { r: 79, g: 3, b: 10 };
        assert_eq!(rgb.to_string(), "#4f030a");
    }

    #[test]
    fn badges_use_declared_colors_only() {
        let problems = vec![
            Problem {
                id: "p1".to_string(),
                name: "Prob-1".to_string(),
                color: Some("red".to_string()),
            },
            Problem {
                id: "p2".to_string(),
                name: "Prob-2".to_string(),
                color: None,
            },
        ];
        let badges = problem_badges(&problems);
        assert_eq!(badges.len(), 2);
        assert_eq!(badges[0].label, "Prob-1");
        assert_eq!(
            badges[0].balloon_image,
            Some(PathBuf::from("assets/balloons/red.png"))
        );
        assert_eq!(badges[1].balloon_image, None);
    }
}
