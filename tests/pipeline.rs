//! End-to-end ingestion and query tests against the in-memory index.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    harness, harness_with, pdf_with_pages, pipeline_with, FailingModel, ScriptedModel,
    ShortEmbedder, WordHashEmbedder,
};
use pdf_rag::config::VectorStoreConfig;
use pdf_rag::pipeline::{Pipeline, PipelineSettings};
use pdf_rag::qdrant::QdrantIndex;
use pdf_rag_core::models::Citation;
use pdf_rag_core::store::{VectorIndex, DEFAULT_DIMS};
use pdf_rag_core::RagError;

#[tokio::test]
async fn test_two_page_pdf_cites_first_page() {
    let h = harness();
    let pdf = pdf_with_pages(&["Alpha", "Beta"]);

    let chunks = h.pipeline.ingest(pdf, "greek.pdf").await.unwrap();
    assert_eq!(chunks, 2);

    let answer = h.pipeline.answer("What is on page 1?", None).await.unwrap();
    assert_eq!(answer.answer, "It says Alpha.");
    assert!(answer.citations.contains(&Citation {
        source_file: "greek.pdf".to_string(),
        page: 1,
    }));

    let calls = h.model.calls();
    assert_eq!(calls.len(), 1);
    let (prompt, max_tokens) = &calls[0];
    assert_eq!(*max_tokens, 512);
    assert!(prompt.starts_with("Use the following context to answer the question.\n"));
    assert!(prompt.contains("Alpha"));
    assert!(prompt.ends_with("Question: What is on page 1?\n"));
}

#[tokio::test]
async fn test_pages_keep_their_numbers() {
    let h = harness();
    h.pipeline
        .ingest(pdf_with_pages(&["Alpha", "Beta"]), "greek.pdf")
        .await
        .unwrap();

    let hits = h.index.search(&[1.0; 384], 10).await.unwrap();
    let mut pages: Vec<(usize, u32, String)> = hits
        .into_iter()
        .map(|s| (s.chunk.chunk_index, s.chunk.page, s.chunk.text))
        .collect();
    pages.sort();
    assert_eq!(
        pages,
        vec![
            (0, 1, "Alpha".to_string()),
            (1, 2, "Beta".to_string())
        ]
    );
}

#[tokio::test]
async fn test_reingest_doubles_count() {
    let h = harness();
    let pdf = pdf_with_pages(&["Alpha", "Beta"]);

    h.pipeline.ingest(pdf.clone(), "greek.pdf").await.unwrap();
    let first = h.pipeline.count().await.unwrap();
    h.pipeline.ingest(pdf, "greek.pdf").await.unwrap();

    assert_eq!(h.pipeline.count().await.unwrap(), first * 2);
}

#[tokio::test]
async fn test_oversized_upload_writes_nothing() {
    let h = harness();
    let eleven_mb = vec![0u8; 11 * 1024 * 1024];

    let err = h.pipeline.ingest(eleven_mb, "big.pdf").await.unwrap_err();
    assert!(matches!(err, RagError::SizeLimitExceeded { .. }));
    assert_eq!(h.pipeline.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_oversized_file_rejected_before_read() {
    let h = harness_with(PipelineSettings {
        max_bytes: 64,
        ..PipelineSettings::default()
    });
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.pdf");
    std::fs::write(&path, vec![b'x'; 65]).unwrap();

    let err = h.pipeline.ingest_file(&path).await.unwrap_err();
    assert!(matches!(err, RagError::SizeLimitExceeded { size: 65, limit: 64 }));
    assert_eq!(h.pipeline.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ingest_file_uses_file_name() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, pdf_with_pages(&["Gamma"])).unwrap();

    let report = h.pipeline.ingest_file(&path).await.unwrap();
    assert_eq!(report.source_file, "notes.pdf");
    assert_eq!(report.chunks, 1);
}

#[tokio::test]
async fn test_non_pdf_is_format_error() {
    let h = harness();
    let err = h
        .pipeline
        .ingest(b"just some text".to_vec(), "notes.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DocumentFormat(_)));
    assert_eq!(h.pipeline.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_source_name_rejected() {
    let h = harness();
    let err = h
        .pipeline
        .ingest(pdf_with_pages(&["Alpha"]), "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));
}

#[tokio::test]
async fn test_url_ingest_names_source_after_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(pdf_with_pages(&["Alpha", "Beta"])),
        )
        .mount(&server)
        .await;

    let h = harness();
    let report = h
        .pipeline
        .ingest_url(&format!("{}/library/greek.pdf", server.uri()))
        .await
        .unwrap();
    assert_eq!(report.source_file, "greek.pdf");
    assert_eq!(report.chunks, 2);
}

#[tokio::test]
async fn test_url_timeout_leaves_collection_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(pdf_with_pages(&["Alpha"]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let h = harness_with(PipelineSettings {
        fetch_timeout: Duration::from_millis(300),
        ..PipelineSettings::default()
    });
    h.pipeline
        .ingest(pdf_with_pages(&["Alpha"]), "seed.pdf")
        .await
        .unwrap();
    let before = h.pipeline.count().await.unwrap();

    let err = h
        .pipeline
        .ingest_url(&format!("{}/slow.pdf", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Fetch(_)));
    assert_eq!(h.pipeline.count().await.unwrap(), before);
}

#[tokio::test]
async fn test_question_validation() {
    let h = harness();

    let err = h.pipeline.answer("   ", None).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));

    for tokens in [100, 2048] {
        let err = h.pipeline.answer("Why?", Some(tokens)).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
    }
    assert!(h.model.calls().is_empty());

    h.pipeline.answer("Why?", Some(1024)).await.unwrap();
    assert_eq!(h.model.calls()[0].1, 1024);
}

#[tokio::test]
async fn test_empty_index_still_asks_model() {
    let h = harness();

    let answer = h.pipeline.answer("Anything there?", None).await.unwrap();
    assert!(answer.citations.is_empty());

    let calls = h.model.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].0,
        "Use the following context to answer the question.\n\nQuestion: Anything there?\n"
    );
}

#[tokio::test]
async fn test_citations_capped_at_top_k() {
    let h = harness();
    for name in ["a.pdf", "b.pdf", "c.pdf"] {
        h.pipeline
            .ingest(pdf_with_pages(&["Alpha", "Beta"]), name)
            .await
            .unwrap();
    }

    let answer = h.pipeline.answer("Alpha", None).await.unwrap();
    assert_eq!(answer.citations.len(), 4);
    assert_eq!(answer.citations[0].page, 1);
}

#[tokio::test]
async fn test_completion_failure_surfaces_as_upstream() {
    let (pipeline, _index) = pipeline_with(
        Arc::new(WordHashEmbedder { dims: DEFAULT_DIMS }),
        Arc::new(FailingModel(|| RagError::upstream("429 rate limited"))),
        PipelineSettings::default(),
    );
    pipeline
        .ingest(pdf_with_pages(&["Alpha"]), "greek.pdf")
        .await
        .unwrap();

    let err = pipeline.answer("What is Alpha?", None).await.unwrap_err();
    assert!(matches!(err, RagError::Upstream(_)));
}

#[tokio::test]
async fn test_embedding_count_mismatch_writes_nothing() {
    let (pipeline, index) = pipeline_with(
        Arc::new(ShortEmbedder { dims: DEFAULT_DIMS }),
        Arc::new(ScriptedModel::new("unused")),
        PipelineSettings::default(),
    );

    let err = pipeline
        .ingest(pdf_with_pages(&["Alpha", "Beta"]), "greek.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::ResponseFormat(_)));
    assert_eq!(index.count().await.unwrap(), 0);
}

/// Serves one response with a chunked body of `pieces` x `piece_len` bytes.
async fn chunked_pdf_server(pieces: usize, piece_len: usize) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let mut response = b"HTTP/1.1 200 OK\r\n\
            Content-Type: application/pdf\r\n\
            Transfer-Encoding: chunked\r\n\r\n"
            .to_vec();
        for _ in 0..pieces {
            response.extend_from_slice(format!("{:x}\r\n", piece_len).as_bytes());
            response.extend_from_slice(&vec![b'%'; piece_len]);
            response.extend_from_slice(b"\r\n");
        }
        response.extend_from_slice(b"0\r\n\r\n");
        // The client may hang up once it has seen enough.
        let _ = socket.write_all(&response).await;
    });
    format!("http://{}/stream.pdf", addr)
}

#[tokio::test]
async fn test_chunked_download_over_cap_writes_nothing() {
    let url = chunked_pdf_server(4, 512).await;
    let h = harness_with(PipelineSettings {
        max_bytes: 1024,
        ..PipelineSettings::default()
    });

    let err = h.pipeline.ingest_url(&url).await.unwrap_err();
    assert!(matches!(err, RagError::SizeLimitExceeded { limit: 1024, .. }));
    assert_eq!(h.pipeline.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_fresh_qdrant_collection_answers_without_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/uploaded_pdfs_384"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/uploaded_pdfs_384"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/uploaded_pdfs_384/points/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": []})))
        .expect(1)
        .mount(&server)
        .await;

    let index = QdrantIndex::new(&VectorStoreConfig {
        url: server.uri(),
        ..VectorStoreConfig::default()
    })
    .unwrap();
    let model = Arc::new(ScriptedModel::new("Nothing indexed yet."));
    let pipeline = Pipeline::new(
        Arc::new(index),
        Arc::new(WordHashEmbedder { dims: DEFAULT_DIMS }),
        model.clone(),
        PipelineSettings::default(),
    )
    .unwrap_or_else(|e| panic!("pipeline: {}", e));

    pipeline.ensure_collection().await.unwrap();
    let answer = pipeline.answer("Anything there?", None).await.unwrap();
    assert_eq!(answer.answer, "Nothing indexed yet.");
    assert!(answer.citations.is_empty());
    assert_eq!(model.calls().len(), 1);
}
