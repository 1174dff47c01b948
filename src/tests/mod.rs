// Scenario tests running guest code through the whole machine

#[cfg(test)]
mod asm;



#[cfg(test)]
mod bus_tests;


#[cfg(test)]
mod gpu_tests;
