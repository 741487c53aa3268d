use rand::distr::weighted::{self, WeightedIndex};
use rand::prelude::Distribution;

/// Choose among `choices` with probability proportional to each entry's
/// weight.
///
/// # Errors
///
/// Function will return an error if `choices` is empty or no entry has a
/// non-zero weight.
pub(crate) fn weighted_choice<'a, T, R>(
    rng: &mut R,
    choices: &'a [(T, u32)],
) -> Result<&'a T, weighted::Error>
where
    R: rand::Rng + ?Sized,
{
    let index = WeightedIndex::new(choices.iter().map(|&(_, weight)| weight))?;
    Ok(&choices[index.sample(rng)].0)
}

#[cfg(test)]
mod test {
    use rand::{SeedableRng, rngs::SmallRng};

    use super::weighted_choice;

    #[test]
    fn zero_weight_entries_never_chosen() {
        let mut rng = SmallRng::seed_from_u64(101);
        let choices = [("always", 1), ("never", 0)];
        for _ in 0..1_000 {
            let picked = weighted_choice(&mut rng, &choices).expect("non-degenerate weights");
            assert_eq!(*picked, "always");
        }
    }

    #[test]
    fn all_zero_weights_error() {
        let mut rng = SmallRng::seed_from_u64(102);
        let choices = [(true, 0), (false, 0)];
        assert!(weighted_choice(&mut rng, &choices).is_err());
    }

    #[test]
    fn weights_shape_the_distribution() {
        let mut rng = SmallRng::seed_from_u64(103);
        let choices = [(true, 70), (false, 30)];

        let mut hits = 0u32;
        for _ in 0..10_000 {
            if *weighted_choice(&mut rng, &choices).expect("non-degenerate weights") {
                hits += 1;
            }
        }
        // 70% +- a generous margin.
        assert!((6_500..=7_500).contains(&hits), "{hits} hits");
    }
}
