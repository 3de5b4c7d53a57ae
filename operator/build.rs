use std::fs;
use kube::CustomResourceExt;
use agentcore_types::*;

fn main() {
    let _ = fs::create_dir("../crds");
    fs::write("../crds/agentcore.beebs.dev_memory_crd.yaml", serde_yaml::to_string(&Memory::crd()).unwrap()).unwrap();
    fs::write("../crds/agentcore.beebs.dev_memorystrategy_crd.yaml", serde_yaml::to_string(&MemoryStrategy::crd()).unwrap()).unwrap();
    fs::write("../crds/agentcore.beebs.dev_gatewaytarget_crd.yaml", serde_yaml::to_string(&GatewayTarget::crd()).unwrap()).unwrap();
    fs::write("../crds/agentcore.beebs.dev_tokenvaultcmk_crd.yaml", serde_yaml::to_string(&TokenVaultCmk::crd()).unwrap()).unwrap();
    fs::write("../crds/agentcore.beebs.dev_workloadidentity_crd.yaml", serde_yaml::to_string(&WorkloadIdentity::crd()).unwrap()).unwrap();
    fs::write("../crds/agentcore.beebs.dev_codeinterpreter_crd.yaml", serde_yaml::to_string(&CodeInterpreter::crd()).unwrap()).unwrap();
}
