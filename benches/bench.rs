// Criterion benchmarks for Mentor Match

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mentor_match::core::{score_pair, AssignmentEngine, Batch};
use mentor_match::models::{
    CommonInterestIndex, ExistingPairingIndex, Interest, MatchingPolicy, Mentee, Mentor, Person, Profile,
    SharedInterest,
};

const TOPICS: [&str; 10] = [
    "ai", "security", "rust", "cloud", "design", "sales", "data", "ops", "finance", "people",
];

fn create_person(id: String, department: &str, seed: usize) -> Person {
    let interests = (0..1 + seed % 5)
        .map(|i| Interest::new(i as u32 + 1, TOPICS[(seed + i * 3) % TOPICS.len()]))
        .collect();
    Person::new(Profile::new(id.clone(), format!("User {}", id), department), interests)
}

fn create_batch(mentee_count: usize, mentor_count: usize) -> Batch {
    let mentees: Vec<Mentee> = (0..mentee_count)
        .map(|i| Mentee::new(create_person(format!("mentee-{}", i), "sales", i)))
        .collect();
    let mentors: Vec<Mentor> = (0..mentor_count)
        .map(|i| Mentor::new(create_person(format!("mentor-{}", i), "eng", i * 7 + 1), (i % 5) as u32))
        .collect();

    let common_interests = CommonInterestIndex::from_people(
        mentees.iter().map(|m| &m.person),
        mentors.iter().map(|m| &m.person),
    );

    Batch {
        mentees,
        mentors,
        common_interests,
        existing_pairings: ExistingPairingIndex::new(),
    }
}

fn bench_score_pair(c: &mut Criterion) {
    let policy = MatchingPolicy::default();
    let shared: Vec<SharedInterest> = (1..=5)
        .map(|rank| SharedInterest {
            name: TOPICS[rank as usize].to_string(),
            mentee_rank: rank,
            mentor_rank: 6 - rank,
        })
        .collect();

    c.bench_function("score_pair", |b| {
        b.iter(|| score_pair(black_box(&shared), black_box(2), black_box(&policy)));
    });
}

fn bench_assignment(c: &mut Criterion) {
    let engine = AssignmentEngine::default();

    let mut group = c.benchmark_group("assignment");

    for (mentees, mentors) in [(1, 20), (10, 50), (10, 200), (50, 500)].iter() {
        let batch = create_batch(*mentees, *mentors);

        group.bench_with_input(
            BenchmarkId::new("run", format!("{}x{}", mentees, mentors)),
            &batch,
            |b, batch| {
                b.iter(|| engine.run(black_box(batch)));
            },
        );
    }

    group.finish();
}

fn bench_common_interest_index(c: &mut Criterion) {
    let mentees: Vec<Person> = (0..10)
        .map(|i| create_person(format!("mentee-{}", i), "sales", i))
        .collect();
    let mentors: Vec<Person> = (0..200)
        .map(|i| create_person(format!("mentor-{}", i), "eng", i * 7 + 1))
        .collect();

    c.bench_function("common_interest_index_10x200", |b| {
        b.iter(|| CommonInterestIndex::from_people(black_box(mentees.iter()), black_box(mentors.iter())));
    });
}

criterion_group!(benches, bench_score_pair, bench_assignment, bench_common_interest_index);

criterion_main!(benches);
