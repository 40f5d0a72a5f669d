//! Descriptive statistics and the significance tests used to compare
//! strategies.
//!
//! Two-sided p-values throughout. Rank tests use the normal approximation
//! with tie correction; the t and F tests use their exact distributions via
//! the regularized incomplete beta function.

use anyhow::{Result, bail};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Describe {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub count: usize,
}

/// Outcome of a two-sample or paired test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub test: &'static str,
    pub statistic: f64,
    pub p_value: f64,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anova {
    pub f: f64,
    pub p_value: f64,
    pub df_between: usize,
    pub df_within: usize,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn describe(values: &[f64]) -> Option<Describe> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(Describe {
        mean: m,
        std: variance.sqrt(),
        count: values.len(),
    })
}

/// Sample standard deviation (n - 1 denominator), `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    Some(sample_variance(values, m).sqrt())
}

fn sample_variance(values: &[f64], m: f64) -> f64 {
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Paired Student t test on `a[i] - b[i]`.
pub fn paired_t(a: &[f64], b: &[f64]) -> Result<TestResult> {
    if a.len() != b.len() {
        bail!("paired test needs equal sample sizes ({} vs {})", a.len(), b.len());
    }
    let n = a.len();
    if n < 2 {
        bail!("paired t test needs at least 2 pairs, got {n}");
    }
    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let m = diffs.iter().sum::<f64>() / n as f64;
    let sd = sample_variance(&diffs, m).sqrt();
    if sd == 0.0 {
        bail!("paired differences have zero variance");
    }
    let t = m / (sd / (n as f64).sqrt());
    Ok(TestResult {
        test: "paired-t",
        statistic: t,
        p_value: student_t_two_sided(t, (n - 1) as f64),
        n,
    })
}

/// Wilcoxon signed-rank test. Zero differences are dropped; the statistic is
/// the smaller of the positive and negative rank sums.
pub fn wilcoxon(a: &[f64], b: &[f64]) -> Result<TestResult> {
    if a.len() != b.len() {
        bail!("paired test needs equal sample sizes ({} vs {})", a.len(), b.len());
    }
    let diffs: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len();
    if n == 0 {
        bail!("wilcoxon test needs at least one non-zero difference");
    }
    let magnitudes: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let (ranks, tie_term) = rank_with_ties(&magnitudes);
    let w_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let nf = n as f64;
    let w_minus = nf * (nf + 1.0) / 2.0 - w_plus;
    let statistic = w_plus.min(w_minus);

    let expected = nf * (nf + 1.0) / 4.0;
    let variance = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term / 48.0;
    if variance <= 0.0 {
        bail!("wilcoxon variance is zero");
    }
    let z = (statistic - expected) / variance.sqrt();
    Ok(TestResult {
        test: "wilcoxon",
        statistic,
        p_value: normal_two_sided(z),
        n,
    })
}

/// Mann-Whitney U test for independent samples, with continuity correction.
/// The statistic is U for the first sample.
pub fn mann_whitney(a: &[f64], b: &[f64]) -> Result<TestResult> {
    let (n1, n2) = (a.len(), b.len());
    if n1 == 0 || n2 == 0 {
        bail!("mann-whitney needs two non-empty samples ({n1} vs {n2})");
    }
    let pooled: Vec<f64> = a.iter().chain(b).copied().collect();
    let (ranks, tie_term) = rank_with_ties(&pooled);
    let r1: f64 = ranks[..n1].iter().sum();
    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let u1 = r1 - n1f * (n1f + 1.0) / 2.0;

    let total = n1f + n2f;
    let expected = n1f * n2f / 2.0;
    let variance =
        n1f * n2f / 12.0 * ((total + 1.0) - tie_term / (total * (total - 1.0)));
    if variance <= 0.0 {
        bail!("mann-whitney variance is zero");
    }
    let z = ((u1 - expected).abs() - 0.5).max(0.0) / variance.sqrt();
    Ok(TestResult {
        test: "mann-whitney",
        statistic: u1,
        p_value: normal_two_sided(z),
        n: n1 + n2,
    })
}

/// One-way ANOVA across groups.
pub fn one_way_anova(groups: &[Vec<f64>]) -> Result<Anova> {
    let groups: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    let k = groups.len();
    if k < 2 {
        bail!("anova needs at least 2 non-empty groups, got {k}");
    }
    let total: usize = groups.iter().map(|g| g.len()).sum();
    if total <= k {
        bail!("anova needs more observations ({total}) than groups ({k})");
    }
    let grand = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / total as f64;
    let mut between = 0.0;
    let mut within = 0.0;
    for group in &groups {
        let m = group.iter().sum::<f64>() / group.len() as f64;
        between += group.len() as f64 * (m - grand).powi(2);
        within += group.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }
    if within == 0.0 {
        bail!("anova within-group variance is zero");
    }
    let (df1, df2) = (k - 1, total - k);
    let f = (between / df1 as f64) / (within / df2 as f64);
    Ok(Anova {
        f,
        p_value: f_upper_tail(f, df1 as f64, df2 as f64),
        df_between: df1,
        df_within: df2,
    })
}

/// Average ranks (1-based) and `Σ(t³ - t)` over tie groups.
pub fn rank_with_ties(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));
    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let avg = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        let t = (end - start) as f64;
        tie_term += t * t * t - t;
        start = end;
    }
    (ranks, tie_term)
}

pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    incomplete_beta(df / (df + t * t), df / 2.0, 0.5)
}

pub fn f_upper_tail(f: f64, df1: f64, df2: f64) -> f64 {
    if f <= 0.0 {
        return 1.0;
    }
    incomplete_beta(df2 / (df2 + df1 * f), df2 / 2.0, df1 / 2.0)
}

pub fn normal_two_sided(z: f64) -> f64 {
    erfc(z.abs() / std::f64::consts::SQRT_2).min(1.0)
}

/// Complementary error function (Chebyshev fit, fractional error < 1.2e-7).
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 { r } else { 2.0 - r }
}

/// Natural log of the gamma function (Lanczos, g = 7).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut sum = COEFFS[0];
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Regularized incomplete beta `I_x(a, b)`.
pub fn incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_fraction(1.0 - x, b, a) / b
    }
}

/// Continued fraction for the incomplete beta (modified Lentz).
fn beta_fraction(x: f64, a: f64, b: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-14;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;
    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}
