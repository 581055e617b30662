use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lightpaint::{stack, Frame};

fn frames(count: usize, width: u32, height: u32) -> Vec<Frame> {
    (0..count)
        .map(|i| {
            let mut pixels = vec![16u8; (width * height * 3) as usize];
            // Diagonal streak that moves between frames.
            for y in 0..height {
                let x = (y + i as u32 * 5) % width;
                let idx = ((y * width + x) * 3) as usize;
                pixels[idx..idx + 3].copy_from_slice(&[255, 220, 80]);
            }
            Frame::new(pixels, width, height, i as u64)
        })
        .collect()
}

fn bench_stack(c: &mut Criterion) {
    let mut group = c.benchmark_group("lighten_stack");
    group.sample_size(20);
    for &count in &[10usize, 60] {
        let input = frames(count, 640, 480);
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter(|| stack(black_box(input)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stack);
criterion_main!(benches);
