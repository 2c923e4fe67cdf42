//! # Provider Against the Fleet Agent
//!
//! Full deployment cycle: the provider applies, reads and removes
//! components on a running [`fleet_agent::Agent`].

#[cfg(test)]
mod tests {
    use super::super::harness::{provider, provider_config, BROKER};
    use fleet_agent::{Agent, AgentConfig};
    use fr_02_remote_provider::{ProviderError, TargetProvider};
    use shared_bus::InMemoryBroker;
    use shared_types::{
        ComponentAction, ComponentSpec, ComponentStatus, ComponentStep, DeploymentSpec,
        DeploymentStep, Request, State,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn deployment() -> DeploymentSpec {
        DeploymentSpec {
            instance_name: "site-a".to_string(),
            ..DeploymentSpec::default()
        }
    }

    fn step(components: &[(ComponentAction, &str)]) -> DeploymentStep {
        DeploymentStep {
            target: "edge-1".to_string(),
            components: components
                .iter()
                .map(|(action, name)| ComponentStep {
                    action: *action,
                    component: ComponentSpec::new(*name, "container"),
                })
                .collect(),
            role: String::new(),
        }
    }

    fn reference(name: &str) -> ComponentStep {
        ComponentStep {
            action: ComponentAction::Update,
            component: ComponentSpec::new(name, ""),
        }
    }

    async fn agent(broker: &InMemoryBroker) -> Agent {
        let config = AgentConfig::from_json(&format!(
            r#"{{"brokerAddress": "{BROKER}", "clientID": "edge-1"}}"#
        ))
        .unwrap();
        Agent::start_with(Arc::new(broker.clone()), config)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_apply_get_remove_cycle() {
        let broker = InMemoryBroker::new();
        let agent = agent(&broker).await;
        let provider = provider(&broker, provider_config(Duration::from_secs(5))).await;
        let deployment = deployment();

        // Fresh agent holds nothing.
        assert!(provider.get(&deployment, &[]).await.unwrap().is_empty());

        let results = provider
            .apply(
                &deployment,
                &step(&[(ComponentAction::Update, "web"), (ComponentAction::Update, "db")]),
                false,
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["web"].status, ComponentStatus::Updated);
        assert_eq!(agent.store().len(), 2);

        let web = provider.get(&deployment, &[reference("web")]).await.unwrap();
        assert_eq!(web.len(), 1);
        assert_eq!(web[0].component_type, "container");

        let results = provider
            .apply(&deployment, &step(&[(ComponentAction::Delete, "db")]), false)
            .await
            .unwrap();
        assert_eq!(results["db"].status, ComponentStatus::Deleted);
        assert_eq!(agent.store().len(), 1);

        provider
            .remove(&deployment, &[ComponentSpec::new("web", "container")])
            .await
            .unwrap();
        assert!(provider.get(&deployment, &[]).await.unwrap().is_empty());

        agent.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_dry_run_leaves_agent_untouched() {
        let broker = InMemoryBroker::new();
        let agent = agent(&broker).await;
        let provider = provider(&broker, provider_config(Duration::from_secs(5))).await;

        let results = provider
            .apply(&deployment(), &step(&[(ComponentAction::Update, "web")]), true)
            .await
            .unwrap();
        assert!(results.is_empty());
        assert!(agent.store().is_empty());
    }

    #[tokio::test]
    async fn test_agent_greets_and_rejects_unknown_routes() {
        let broker = InMemoryBroker::new();
        let _agent = agent(&broker).await;
        let provider = provider(&broker, provider_config(Duration::from_secs(5))).await;

        let response = provider
            .invoke(Request::new("GET", "greetings"))
            .await
            .unwrap();
        assert_eq!(response.body_text(), "Hi there!!");

        let err = provider
            .invoke(Request::new("PUT", "instances"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Remote { state: State::NotFound, .. }));
    }

    #[tokio::test]
    async fn test_stopped_agent_times_out() {
        let broker = InMemoryBroker::new();
        let agent = agent(&broker).await;
        let provider = provider(&broker, provider_config(Duration::from_millis(200))).await;
        agent.shutdown().await.unwrap();

        let err = provider.get(&deployment(), &[]).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
