//! A two-leaf clustering tree driven end to end.

use cudascope_aggregator::Component;
use cudascope_clustering::{cuda_leaf_pipeline, ClusteringFilter};
use cudascope_gpu::messages::{CompletedExec, EnqueueRequest, RequestKind, Vector3};
use cudascope_gpu::{CudaData, CudaMessage, COLLECTOR_ID};
use cudascope_shared::protocol::wire::{
    AttachedToThreads, Blob, BlobHeader, ThreadRecord, ThreadState, ThreadsStateChanged,
};
use cudascope_shared::{Address, Message, ThreadName};

fn thread(pid: u64) -> ThreadName {
    ThreadName::new("node", pid, Some(pid * 10), None)
}

fn kernel_blob(pid: u64, pc: u64, duration: u64) -> Message {
    let header = BlobHeader {
        experiment: 0,
        collector: 1,
        id: COLLECTOR_ID.to_string(),
        thread: ThreadRecord::from(&thread(pid)),
        time_begin: 0,
        time_end: 10_000,
    };
    let messages = vec![
        CudaMessage::EnqueueRequest(EnqueueRequest {
            kind: RequestKind::ExecuteKernel,
            time: 100,
            context: pid,
            stream: 0,
            correlation_id: 1,
            call_site: 0,
        }),
        CudaMessage::CompletedExec(CompletedExec {
            context: pid,
            stream: 0,
            correlation_id: 1,
            time_begin: 200,
            time_end: 200 + duration,
            function: "stencil".to_string(),
            grid: Vector3::new(64, 64, 1),
            block: Vector3::new(16, 16, 1),
            cache_preference: Default::default(),
            registers_per_thread: 32,
            static_shared_memory: 0,
            dynamic_shared_memory: 0,
            local_memory: 0,
        }),
    ];
    let data = CudaData {
        messages,
        stack_traces: vec![pc, 0],
    };
    Message::Data(Blob::new(header, &data).unwrap())
}

fn lifecycle(pid: u64, state: Option<ThreadState>) -> Message {
    let threads = vec![ThreadRecord::from(&thread(pid))];
    match state {
        None => Message::AttachedToThreads(AttachedToThreads { threads }),
        Some(state) => Message::ThreadsStateChanged(ThreadsStateChanged { threads, state }),
    }
}

#[test]
fn leaves_feed_a_filter() {
    let mut filter = ClusteringFilter::new(2);
    let mut root = Vec::new();
    let mut features = Vec::new();

    for (pid, duration) in [(1u64, 500u64), (2, 1_500)] {
        let mut leaf = cuda_leaf_pipeline();
        let mut out = Vec::new();
        for message in [
            lifecycle(pid, None),
            kernel_blob(pid, 0x401000, duration),
            lifecycle(pid, Some(ThreadState::Terminated)),
        ] {
            leaf.send(message, &mut out).unwrap();
        }

        let kinds: Vec<&str> = out.iter().map(Message::kind).collect();
        assert_eq!(
            kinds,
            vec!["AddressBuffer", "LinkedObjectGroup", "Data", "Feature", "ThreadsFinished"]
        );

        for message in out {
            match message {
                Message::Feature(vector) => features.push(vector),
                Message::Data(_) | Message::LinkedObjectGroup(_) => {}
                other => filter.handle(other, &mut root).unwrap(),
            }
        }
    }

    assert_eq!(features.len(), 2);
    assert_eq!(features[0].thread(), &thread(1));
    assert_eq!(features[0].values()[1], 500.0);
    assert_eq!(features[1].values()[1], 1_500.0);

    match root.as_slice() {
        [Message::AddressBuffer(buffer), Message::ThreadsFinished(true)] => {
            assert_eq!(buffer.count(Address::new(0x401000)), 2);
        }
        other => panic!("unexpected {:?}", other),
    }
}
