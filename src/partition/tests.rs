#[cfg(test)]
mod tests {
    use crate::partition::*;

    fn catalog_ids(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("video_{:02}", i)).collect()
    }

    fn as_refs(ids: &[String]) -> Vec<&str> {
        ids.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_default_config_selects_everything() {
        let ids = catalog_ids(4);
        let selected = shard_videos(&as_refs(&ids), &ShardConfig::default());
        assert_eq!(selected, ids);
    }

    #[test]
    fn test_window_bounds_are_half_open() {
        let ids = catalog_ids(5);
        let config = ShardConfig {
            low_idx: 1,
            high_idx: 3,
            ..ShardConfig::default()
        };
        let selected = shard_videos(&as_refs(&ids), &config);
        assert_eq!(selected, vec!["video_01", "video_02"]);
    }

    #[test]
    fn test_end_sentinel_extends_to_catalog_end() {
        let ids = catalog_ids(5);
        let config = ShardConfig {
            low_idx: 2,
            high_idx: WINDOW_END,
            ..ShardConfig::default()
        };
        let selected = shard_videos(&as_refs(&ids), &config);
        assert_eq!(selected, vec!["video_02", "video_03", "video_04"]);
    }

    #[test]
    fn test_window_past_end_is_empty() {
        let ids = catalog_ids(3);
        let config = ShardConfig {
            low_idx: 10,
            high_idx: WINDOW_END,
            ..ShardConfig::default()
        };
        assert!(shard_videos(&as_refs(&ids), &config).is_empty());
    }

    #[test]
    fn test_high_bound_clamps_to_catalog_length() {
        let ids = catalog_ids(3);
        let config = ShardConfig {
            low_idx: 1,
            high_idx: 99,
            ..ShardConfig::default()
        };
        let selected = shard_videos(&as_refs(&ids), &config);
        assert_eq!(selected, vec!["video_01", "video_02"]);
    }

    #[test]
    fn test_round_robin_sharding_covers_catalog_without_overlap() {
        let ids = catalog_ids(6);
        let refs = as_refs(&ids);

        let rank0 = shard_videos(
            &refs,
            &ShardConfig {
                num_shards: 2,
                shard_rank: 0,
                ..ShardConfig::default()
            },
        );
        let rank1 = shard_videos(
            &refs,
            &ShardConfig {
                num_shards: 2,
                shard_rank: 1,
                ..ShardConfig::default()
            },
        );

        assert_eq!(rank0, vec!["video_00", "video_02", "video_04"]);
        assert_eq!(rank1, vec!["video_01", "video_03", "video_05"]);
    }

    #[test]
    fn test_sharding_applies_to_window_positions() {
        let ids = catalog_ids(5);
        let config = ShardConfig {
            low_idx: 1,
            high_idx: WINDOW_END,
            num_shards: 2,
            shard_rank: 0,
        };
        // Window is [video_01 .. video_04]; rank 0 takes window positions 0 and 2.
        let selected = shard_videos(&as_refs(&ids), &config);
        assert_eq!(selected, vec!["video_01", "video_03"]);
    }

    #[test]
    fn test_zero_shards_rejected() {
        let config = ShardConfig {
            num_shards: 0,
            ..ShardConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rank_out_of_range_rejected() {
        let config = ShardConfig {
            num_shards: 2,
            shard_rank: 2,
            ..ShardConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_high_idx_below_sentinel_rejected() {
        let config = ShardConfig {
            high_idx: -2,
            ..ShardConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(ShardConfig::default().validate().is_ok());
    }

    #[test]
    fn test_slots_assigned_round_robin() {
        let assignments = assign_slots(catalog_ids(5), 2);
        let slots: Vec<usize> = assignments.iter().map(|a| a.slot).collect();
        assert_eq!(slots, vec![0, 1, 0, 1, 0]);
        assert_eq!(assignments[0].video_id, "video_00");
    }

    #[test]
    fn test_single_slot_pins_everything_to_zero() {
        let assignments = assign_slots(catalog_ids(3), 1);
        assert!(assignments.iter().all(|a| a.slot == 0));
    }
}
