use std::ops::ControlFlow;

use ethash_progpow::{
    calc_dataset_item, check_difficulty, get_cache_size, get_full_size, hashimoto_full,
    hashimoto_light, hashimoto_view, make_cache, make_dataset, quick_check_difficulty, quick_hash,
    Dataset, DatasetView, Error, FullDAG, LightDAG, HASH_BYTES,
};
use ethereum_types::H256;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CACHE_SIZE: usize = 1024;
const FULL_SIZE: usize = 32 * 1024;

const TEST_CACHE: &str = "2da2b506f21070e1143d908e867962486d6b0a02e31d468fd5e3a7143aafa76a14201f63374314e2a6aaf84ad2eb57105dea3378378965a1b3873453bb2b78f9a8620b2ebeca41fbc773bb837b5e724d6eb2de570d99858df0d7d97067fb8103b21757873b735097b35d3bea8fd1c359a9e8a63c1540c76c9784cf8d975e995ca8620b2ebeca41fbc773bb837b5e724d6eb2de570d99858df0d7d97067fb8103b21757873b735097b35d3bea8fd1c359a9e8a63c1540c76c9784cf8d975e995ca8620b2ebeca41fbc773bb837b5e724d6eb2de570d99858df0d7d97067fb8103b21757873b735097b35d3bea8fd1c359a9e8a63c1540c76c9784cf8d975e995c259440b89fa3481c2c33171477c305c8e1e421f8d8f6d59585449d0034f3e421808d8da6bbd0b6378f567647cc6c4ba6c434592b198ad444e7284905b7c6adaf70bf43ec2daa7bd5e8951aa609ab472c124cf9eba3d38cff5091dc3f58409edcc386c743c3bd66f92408796ee1e82dd149eaefbf52b00ce33014a6eb3e50625413b072a58bc01da28262f42cbe4f87d4abc2bf287d15618405a1fe4e386fcdafbb171064bd99901d8f81dd6789396ce5e364ac944bbbd75a7827291c70b42d26385910cd53ca535ab29433dd5c5714d26e0dce95514c5ef866329c12e958097e84462197c2b32087849dab33e88b11da61d52f9dbc0b92cc61f742c07dbbf751c49d7678624ee60dfbe62e5e8c47a03d8247643f3d16ad8c8e663953bcda1f59d7e2d4a9bf0768e789432212621967a8f41121ad1df6ae1fa78782530695414c6213942865b2730375019105cae91a4c17a558d4b63059661d9f108362143107babe0b848de412e4da59168cce82bfbff3c99e022dd6ac1e559db991f2e3f7bb910cefd173e65ed00a8d5d416534e2c8416ff23977dbf3eb7180b75c71580d08ce95efeb9b0afe904ea12285a392aff0c8561ff79fca67f694a62b9e52377485c57cc3598d84cac0a9d27960de0cc31ff9bbfe455acaa62c8aa5d2cce96f345da9afe843d258a99c4eaf3650fc62efd81c7b81cd0d534d2d71eeda7a6e315d540b4473c80f8730037dc2ae3e47b986240cfc65ccc565f0d8cde0bc68a57e39a271dda57440b3598bee19f799611d25731a96b5dbbbefdff6f4f656161462633030d62560ea4e9c161cf78fc96a2ca5aaa32453a6c5dea206f766244e8c9d9a8dc61185ce37f1fc804459c5f07434f8ecb34141b8dcae7eae704c950b55556c5f40140c3714b45eddb02637513268778cbf937a33e4e33183685f9deb31ef54e90161e76d969587dd782eaa94e289420e7c2ee908517f5893a26fdb5873d68f92d118d4bcf98d7a4916794d6ab290045e30f9ea00ca547c584b8482b0331ba1539a0f2714fddc3a0b06b0cfbb6a607b8339c39bcfd6640b1f653e9d70ef6c985b";

fn seed() -> H256 {
    H256([b'~'; 32])
}

fn header() -> H256 {
    let mut h = [b'~'; 32];
    h[3] = b'X';
    H256(h)
}

fn h256(s: &str) -> H256 {
    H256::from_slice(&hex::decode(s).unwrap())
}

fn test_cache() -> Vec<u8> {
    let mut cache = vec![0u8; CACHE_SIZE];
    make_cache(&mut cache, seed()).unwrap();
    cache
}

fn test_dataset(cache: &[u8]) -> Vec<u8> {
    let mut dataset = vec![0u8; FULL_SIZE];
    make_dataset(&mut dataset, cache).unwrap();
    dataset
}

#[test]
fn cache_vector() {
    let cache = test_cache();
    assert_eq!(hex::encode(&cache), TEST_CACHE);
    // Building twice gives the same bytes.
    assert_eq!(test_cache(), cache);
}

#[test]
fn dataset_item_vector() {
    let cache = test_cache();
    let item = calc_dataset_item(&cache, 0);
    assert_eq!(
        hex::encode(item.as_bytes()),
        "b1698f829f90b35455804e5185d78f549fcb1bdce2bee006d4d7e68eb154b596be1427769eb1c3c3e93180c760af75f81d1023da6a0ffbe321c153a7c0103597"
    );
}

#[test]
fn materialized_dataset_matches_the_deriver() {
    let cache = test_cache();
    let dataset = test_dataset(&cache);
    for (i, node) in dataset.chunks(HASH_BYTES).enumerate() {
        assert_eq!(node, calc_dataset_item(&cache, i).as_bytes(), "item {}", i);
    }
}

#[test]
fn light_and_full_vectors() {
    let cache = test_cache();
    let dataset = test_dataset(&cache);

    let light = hashimoto_light(header(), 0x7c7c597c, FULL_SIZE, &cache).unwrap();
    let full = hashimoto_full(header(), 0x7c7c597c, FULL_SIZE, &dataset).unwrap();
    assert_eq!(light, full);
    assert_eq!(
        full.result,
        h256("b8cb1cb3ac1a7a6e12c4bc90f2779ef97e661f7957619e677636509d2f26055c")
    );
    assert_eq!(
        full.mix_hash,
        h256("d7b668b90c2f26961d98d7dd244f5966368165edbce8cb8162dd282b6e5a8eae")
    );
    assert_eq!(quick_hash(header(), 0x7c7c597c, full.mix_hash), full.result);

    let full5 = hashimoto_full(header(), 5, FULL_SIZE, &dataset).unwrap();
    assert_ne!(full5.result, light.result);
    let light5 = hashimoto_light(header(), 5, FULL_SIZE, &cache).unwrap();
    assert_eq!(light5, full5);
    assert_eq!(
        full5.result,
        h256("c54b3e9b77e7ac3bf31b24cec6e7a2bcfbc10fd5f9d5390332d686db24f83bcf")
    );
    assert_eq!(
        full5.mix_hash,
        h256("6183c55fbb63f3e2b5254d3298e2475d73ffd7d8a077a58070801e7dcba13c6a")
    );

    let mut difficulty = [0xffu8; 32];
    difficulty[0] = 197;
    difficulty[1] = 90;
    let difficulty = H256(difficulty);
    assert!(check_difficulty(&full5.result, &difficulty));
    assert!(quick_check_difficulty(header(), 5, full5.mix_hash, difficulty));
}

#[test]
fn go_ethereum_hashimoto_vector() {
    let mut cache = vec![0u8; CACHE_SIZE];
    make_cache(&mut cache, H256::zero()).unwrap();
    let dataset = test_dataset(&cache);
    let header = h256("c9149cc0386e689d789a1c2f3d5d169a61a6218ed30e74414dc736e442ef3d1f");

    let light = hashimoto_light(header, 0, FULL_SIZE, &cache).unwrap();
    let full = hashimoto_full(header, 0, FULL_SIZE, &dataset).unwrap();
    assert_eq!(light, full);
    assert_eq!(
        full.mix_hash,
        h256("e4073cffaef931d37117cefd9afd27ea0f1cad6a981dd2605c4a1ac97c519800")
    );
    assert_eq!(
        full.result,
        h256("d3539235ee2e6f8db665c0a72169f55b7f6c605712330b778ec3944f0eb5a557")
    );
}

#[test]
fn randomized_light_full_equivalence() {
    let cache = test_cache();
    let dataset = test_dataset(&cache);
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..64 {
        let header = H256(rng.gen());
        let nonce: u64 = rng.gen();
        let light =
            hashimoto_view(&DatasetView::CacheOnly(&cache), header, nonce, FULL_SIZE).unwrap();
        let full =
            hashimoto_view(&DatasetView::Materialized(&dataset), header, nonce, FULL_SIZE).unwrap();
        assert_eq!(light, full, "header {:?} nonce {}", header, nonce);
        assert_eq!(quick_hash(header, nonce, full.mix_hash), full.result);
    }
}

#[test]
fn driver_rejects_inconsistent_inputs() {
    let cache = test_cache();
    assert_eq!(
        hashimoto_light(header(), 0, FULL_SIZE + 64, &cache),
        Err(Error::InvalidDatasetSize(FULL_SIZE + 64))
    );
    assert_eq!(
        hashimoto_light(header(), 0, FULL_SIZE, &cache[..100]),
        Err(Error::InvalidCacheSize(100))
    );
    assert_eq!(
        hashimoto_full(header(), 0, FULL_SIZE, &cache),
        Err(Error::DatasetTooShort {
            expected: FULL_SIZE,
            actual: CACHE_SIZE
        })
    );
}

#[test]
fn difficulty_is_monotonic_in_the_boundary() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..256 {
        let hash = H256(rng.gen());
        let boundary = H256(rng.gen());
        let looser = {
            let mut b = boundary;
            let i = rng.gen_range(0..32);
            b.0[i] = b.0[i].saturating_add(rng.gen_range(0..=255));
            b
        };
        if check_difficulty(&hash, &boundary) {
            assert!(check_difficulty(&hash, &looser));
        }
        assert!(check_difficulty(&hash, &hash));
        assert!(check_difficulty(&hash, &H256::repeat_byte(0xff)));
    }
}

#[test]
fn progress_reaches_100_and_abort_returns_nothing() {
    let cache = test_cache();
    let mut last = 0;
    let mut calls = 0;
    let dataset = Dataset::generate(&cache, FULL_SIZE, |p| {
        assert!(p >= last);
        last = p;
        calls += 1;
        ControlFlow::Continue(())
    })
    .unwrap();
    assert_eq!(last, 100);
    assert!(calls > 1);
    assert_eq!(dataset.as_bytes(), &test_dataset(&cache)[..]);

    let aborted = Dataset::generate(&cache, FULL_SIZE, |p| {
        if p > 50 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    match aborted {
        Err(Error::Aborted { percent }) => assert!(percent > 50 && percent < 100),
        other => panic!("expected an abort, got {:?}", other),
    }

    let light = LightDAG::with_sizes(0, CACHE_SIZE, FULL_SIZE, seed()).unwrap();
    assert!(FullDAG::with_progress(light, |_| ControlFlow::Break(())).is_err());
}

#[test]
fn genesis_epoch_parameters() {
    assert_eq!(get_full_size(0).unwrap(), 1073739904);
    assert_eq!(get_cache_size(0).unwrap(), 16776896);
    assert!(get_full_size(2048).is_err());
}

#[test]
fn contexts_agree_with_free_functions() {
    let light = LightDAG::with_sizes(0, CACHE_SIZE, FULL_SIZE, seed()).unwrap();
    assert_eq!(light.cache(), &test_cache()[..]);
    let full = FullDAG::new(light.clone()).unwrap();
    assert_eq!(full.dataset().as_bytes(), &test_dataset(&test_cache())[..]);

    let expected = hashimoto_light(header(), 5, FULL_SIZE, light.cache()).unwrap();
    assert_eq!(light.hashimoto(header(), 5), expected);
    assert_eq!(full.hashimoto(header(), 5), expected);
    assert!(light.verify(header(), 5, expected.mix_hash, expected.result));
}
