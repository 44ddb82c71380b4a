use nestcv::cv::kfold::KFold;
use proptest::prelude::*;

proptest! {
    #[test]
    fn folds_partition_the_rows(n_samples in 2usize..200, k in 2usize..12) {
        prop_assume!(k <= n_samples);
        let folds = KFold::new(k).split(n_samples).unwrap();
        prop_assert_eq!(folds.len(), k);

        // Test sets are contiguous, in order, and cover every row once
        let all_test: Vec<usize> = folds.iter().flat_map(|f| f.test.iter().copied()).collect();
        prop_assert_eq!(all_test, (0..n_samples).collect::<Vec<_>>());

        for (i, fold) in folds.iter().enumerate() {
            let expected = n_samples / k + usize::from(i < n_samples % k);
            prop_assert_eq!(fold.test.len(), expected);
            prop_assert_eq!(fold.train.len() + fold.test.len(), n_samples);
            prop_assert!(fold.train.iter().all(|r| !fold.test.contains(r)));
        }
    }

    #[test]
    fn impossible_splits_are_rejected(n_samples in 0usize..10, extra in 1usize..5) {
        prop_assert!(KFold::new(n_samples + extra).split(n_samples).is_err());
        prop_assert!(KFold::new(1).split(n_samples.max(1)).is_err());
    }
}
