//! Toggle governance and fiscal save over the PostgREST store.

use std::sync::Arc;

use pdv_core::{TenantId, ToggleKey};
use pdv_fiscal::{FiscalEditor, FiscalError};
use pdv_store::{RestStore, StoreConfig, StoreError};
use pdv_toggle::{GovernanceError, ToggleGovernor};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tenant() -> TenantId {
    "7d9f2c1e-4b3a-4e8f-9a61-0c2d5e7f8a90".parse().unwrap()
}

async fn mount_config(server: &MockServer, t: TenantId, regime: i32) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/pdv_config"))
        .and(query_param("empresa_id", format!("eq.{t}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "empresa_id": t.to_string(),
            "controla_caixa": true,
            "tipo_impressao_80mm": true,
            "tipo_impressao_50mm": false,
            "venda_sem_produto_cfop": "5102",
            "venda_sem_produto_situacao_tributaria": "tributado_integral"
        }])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/empresas"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{ "regime_tributario": regime }])),
        )
        .mount(server)
        .await;
}

fn rest_store(server: &MockServer) -> Arc<RestStore> {
    let config = StoreConfig::local_mock(&server.uri(), "service-key").unwrap();
    Arc::new(RestStore::new(config).unwrap())
}

#[tokio::test]
async fn open_session_reported_by_backend_blocks_cash_control() {
    let server = MockServer::start().await;
    let t = tenant();
    mount_config(&server, t, 1).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/caixa_controle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 31, "operador": "carla", "data_abertura": "2026-03-02T11:00:00Z" }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/pdv_config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{}])))
        .expect(0)
        .mount(&server)
        .await;

    let store = rest_store(&server);
    let governor = ToggleGovernor::standard(store.clone(), store);
    let mut view = governor.load_view(&t).await.unwrap();
    assert!(view.get(ToggleKey::ControlaCaixa));

    let err = governor
        .request_change(&mut view, ToggleKey::ControlaCaixa, false)
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::PreconditionBlocked { .. }));
    assert!(view.get(ToggleKey::ControlaCaixa));
}

#[tokio::test]
async fn backend_rejection_is_reverted_locally() {
    let server = MockServer::start().await;
    let t = tenant();
    mount_config(&server, t, 1).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/pdv_config"))
        .respond_with(ResponseTemplate::new(500).set_body_string("update failed"))
        .expect(1)
        .mount(&server)
        .await;

    let store = rest_store(&server);
    let governor = ToggleGovernor::standard(store.clone(), store);
    let mut view = governor.load_view(&t).await.unwrap();

    let result = governor
        .request_change(&mut view, ToggleKey::TipoImpressao50mm, true)
        .await;
    assert!(view.get(ToggleKey::TipoImpressao50mm));
    assert!(!view.get(ToggleKey::TipoImpressao80mm));

    match view.settle(result) {
        Err(GovernanceError::PersistenceFailed {
            cause: StoreError::Api { status, .. },
            ..
        }) => assert_eq!(status, 500),
        other => panic!("expected PersistenceFailed, got {other:?}"),
    }
    assert!(!view.get(ToggleKey::TipoImpressao50mm));
    assert!(view.get(ToggleKey::TipoImpressao80mm));
}

#[tokio::test]
async fn fiscal_save_failure_surfaces_store_cause() {
    let server = MockServer::start().await;
    let t = tenant();
    mount_config(&server, t, 3).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/pdv_config"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&server)
        .await;

    let store = rest_store(&server);
    let editor = FiscalEditor::load(store.as_ref(), &t).await.unwrap();
    assert_eq!(editor.attributes().cst.as_deref(), Some("00"));

    let err = editor.save(store.as_ref()).await.unwrap_err();
    match err {
        FiscalError::PersistenceFailed {
            cause: StoreError::Api { status, body, .. },
        } => {
            assert_eq!(status, 403);
            assert!(body.contains("permission denied"));
        }
        other => panic!("expected PersistenceFailed, got {other:?}"),
    }
}
