use candle_core::{Device, Result, Tensor, bail};
use rand::Rng;
use ringbuffer::{AllocRingBuffer, RingBuffer};

/// One stored experience. `next_observation` is always the observation the
/// environment emitted for the step, never the reset observation of the
/// following episode.
pub struct Transition {
    pub observation: Vec<f32>,
    pub action: u32,
    pub reward: f32,
    pub next_observation: Vec<f32>,
    pub done: bool,
}

/// Fixed-capacity uniform replay memory. Storage and FIFO eviction are
/// delegated to `AllocRingBuffer`, one ring per column.
pub struct ReplayBuffer {
    observations: AllocRingBuffer<Vec<f32>>,
    actions: AllocRingBuffer<u32>,
    rewards: AllocRingBuffer<f32>,
    next_observations: AllocRingBuffer<Vec<f32>>,
    dones: AllocRingBuffer<bool>,
}

/// A minibatch stacked into candle tensors: observations `(b, obs)`, actions
/// `u32 (b,)`, rewards and dones `f32 (b,)`.
pub struct ReplayBatch {
    pub observations: Tensor,
    pub actions: Tensor,
    pub rewards: Tensor,
    pub next_observations: Tensor,
    pub dones: Tensor,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            observations: AllocRingBuffer::new(capacity),
            actions: AllocRingBuffer::new(capacity),
            rewards: AllocRingBuffer::new(capacity),
            next_observations: AllocRingBuffer::new(capacity),
            dones: AllocRingBuffer::new(capacity),
        }
    }

    pub fn push(&mut self, transition: Transition) {
        self.observations.enqueue(transition.observation);
        self.actions.enqueue(transition.action);
        self.rewards.enqueue(transition.reward);
        self.next_observations.enqueue(transition.next_observation);
        self.dones.enqueue(transition.done);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Uniform sampling with replacement.
    pub fn sample<R: Rng>(
        &self,
        batch_size: usize,
        rng: &mut R,
        device: &Device,
    ) -> Result<ReplayBatch> {
        let len = self.len();
        if len == 0 {
            bail!("cannot sample from an empty replay buffer");
        }
        let obs_size = self.observations.get(0).map(|o| o.len()).unwrap_or(0);
        let mut observations = Vec::with_capacity(batch_size * obs_size);
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Vec::with_capacity(batch_size);
        let mut next_observations = Vec::with_capacity(batch_size * obs_size);
        let mut dones = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let idx = rng.random_range(0..len);
            observations.extend_from_slice(self.observations.get(idx).unwrap());
            actions.push(*self.actions.get(idx).unwrap());
            rewards.push(*self.rewards.get(idx).unwrap());
            next_observations.extend_from_slice(self.next_observations.get(idx).unwrap());
            dones.push(if *self.dones.get(idx).unwrap() { 1f32 } else { 0f32 });
        }
        Ok(ReplayBatch {
            observations: Tensor::from_vec(observations, (batch_size, obs_size), device)?,
            actions: Tensor::from_vec(actions, batch_size, device)?,
            rewards: Tensor::from_vec(rewards, batch_size, device)?,
            next_observations: Tensor::from_vec(next_observations, (batch_size, obs_size), device)?,
            dones: Tensor::from_vec(dones, batch_size, device)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn transition(tag: f32) -> Transition {
        Transition {
            observation: vec![tag, tag],
            action: tag as u32,
            reward: tag,
            next_observation: vec![tag + 1., tag + 1.],
            done: false,
        }
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut buffer = ReplayBuffer::new(4);
        for i in 0..6 {
            buffer.push(transition(i as f32));
        }
        assert_eq!(buffer.len(), 4);
        // entries 0 and 1 were evicted
        assert_eq!(*buffer.rewards.get(0).unwrap(), 2.);
        assert_eq!(*buffer.rewards.get(3).unwrap(), 5.);
    }

    #[test]
    fn sample_shapes() -> Result<()> {
        let mut buffer = ReplayBuffer::new(16);
        for i in 0..10 {
            buffer.push(transition(i as f32));
        }
        let mut rng = StdRng::seed_from_u64(0);
        let batch = buffer.sample(8, &mut rng, &Device::Cpu)?;
        assert_eq!(batch.observations.dims(), &[8, 2]);
        assert_eq!(batch.next_observations.dims(), &[8, 2]);
        assert_eq!(batch.actions.dims(), &[8]);
        assert_eq!(batch.rewards.dims(), &[8]);
        let dones: Vec<f32> = batch.dones.to_vec1()?;
        assert!(dones.iter().all(|d| *d == 0. || *d == 1.));
        Ok(())
    }

    #[test]
    fn sample_from_empty_fails() {
        let buffer = ReplayBuffer::new(4);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(buffer.sample(1, &mut rng, &Device::Cpu).is_err());
    }
}
