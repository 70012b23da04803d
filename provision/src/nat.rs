use tracing::info;

use strato_ensure::{PollOptions, ensure, ensure_link, wait_until_available};
use strato_provider::{
    ElasticIpSpec, LinkRelation, NatGatewaySpec, Provider, ResourceDescriptor, ResourceHandle,
    ResourceKey, ResourceKind,
};

use crate::ProvisionError;

#[derive(Debug, Clone)]
pub struct NatGatewayOptions {
    pub eip_name: String,
    pub gateway_name: String,
    pub public_subnet_id: String,
    pub private_subnet_id: String,
    pub route_table_id: String,
    /// Destination block routed through the gateway.
    pub destination: String,
}

#[derive(Debug, Clone)]
pub struct NatGatewayOutput {
    pub elastic_ip: ResourceHandle,
    pub gateway: ResourceHandle,
}

/// Provision a NAT gateway: allocate an elastic IP, create the gateway in
/// the public subnet, wait for it to become available, route the
/// destination block through it, and associate the route table with the
/// private subnet. The association is pre-checked against the provider's
/// enumeration before being applied.
pub async fn provision_nat_gateway<P>(
    provider: &P,
    options: &NatGatewayOptions,
    poll: PollOptions,
) -> Result<NatGatewayOutput, ProvisionError>
where
    P: Provider + ?Sized,
{
    info!(name = %options.eip_name, "ensuring elastic ip");
    let elastic_ip = ensure(
        provider,
        &ResourceKey::new(&options.eip_name),
        &ResourceDescriptor::ElasticIp(ElasticIpSpec::default()),
    )
    .await?;

    info!(name = %options.gateway_name, subnet = %options.public_subnet_id, "ensuring nat gateway");
    let gateway = ensure(
        provider,
        &ResourceKey::scoped(&options.gateway_name, &options.public_subnet_id),
        &ResourceDescriptor::NatGateway(NatGatewaySpec {
            subnet_id: options.public_subnet_id.clone(),
            allocation_id: elastic_ip.id.clone(),
        }),
    )
    .await?;

    info!(gateway = %gateway.id, "waiting for nat gateway to become available");
    let gateway = wait_until_available(provider, &gateway, poll).await?;

    let route_table = ResourceHandle::external(ResourceKind::RouteTable, &options.route_table_id);
    ensure_link(
        provider,
        &route_table,
        &gateway,
        &LinkRelation::DefaultRoute {
            destination: options.destination.clone(),
        },
    )
    .await?;

    let private_subnet =
        ResourceHandle::external(ResourceKind::Subnet, &options.private_subnet_id);
    ensure_link(
        provider,
        &route_table,
        &private_subnet,
        &LinkRelation::SubnetAssociation,
    )
    .await?;

    Ok(NatGatewayOutput {
        elastic_ip,
        gateway,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use strato_provider::{LifecycleState, MemoryProvider, RelationKind};

    fn options() -> NatGatewayOptions {
        NatGatewayOptions {
            eip_name: "nat-eip".to_owned(),
            gateway_name: "nat-main".to_owned(),
            public_subnet_id: "subnet-pub".to_owned(),
            private_subnet_id: "subnet-priv".to_owned(),
            route_table_id: "rtb-1".to_owned(),
            destination: "0.0.0.0/0".to_owned(),
        }
    }

    fn poll() -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn gateway_is_waited_to_available_and_wired_up() {
        let provider = MemoryProvider::new();
        let out = provision_nat_gateway(&provider, &options(), poll())
            .await
            .unwrap();

        assert_eq!(out.gateway.state, LifecycleState::Available);
        assert_eq!(provider.link_count("rtb-1", RelationKind::DefaultRoute), 1);
        assert_eq!(
            provider.link_count("rtb-1", RelationKind::SubnetAssociation),
            1
        );
    }

    #[tokio::test]
    async fn rerunning_does_not_duplicate_routes_or_associations() {
        let provider = MemoryProvider::new();
        let first = provision_nat_gateway(&provider, &options(), poll())
            .await
            .unwrap();
        let second = provision_nat_gateway(&provider, &options(), poll())
            .await
            .unwrap();

        assert_eq!(first.gateway.id, second.gateway.id);
        assert_eq!(provider.create_count(ResourceKind::ElasticIp), 1);
        assert_eq!(provider.create_count(ResourceKind::NatGateway), 1);
        assert_eq!(provider.link_count("rtb-1", RelationKind::DefaultRoute), 1);
        assert_eq!(
            provider.link_count("rtb-1", RelationKind::SubnetAssociation),
            1
        );
    }

    #[tokio::test]
    async fn gateway_that_never_settles_times_out() {
        let provider = MemoryProvider::new();
        provider.hold_pending(ResourceKind::NatGateway);

        let err = provision_nat_gateway(&provider, &options(), poll())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Wait(strato_ensure::WaitError::Timeout { .. })
        ));
    }
}
